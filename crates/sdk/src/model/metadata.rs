use anchor_lang::prelude::Pubkey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use dexloan_math::trim_null_chars;
use dexloan_types::serde_helpers::{option_pubkey_serde, pubkey_serde};

/// On-chain token metadata, trimmed of padding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenMetadata {
    #[serde(with = "pubkey_serde")]
    pub mint: Pubkey,
    pub name: String,
    pub symbol: String,
    pub uri: String,
    /// Verified collection mint, if any
    #[serde(with = "option_pubkey_serde", default)]
    pub collection: Option<Pubkey>,
}

impl TokenMetadata {
    pub fn new(mint: Pubkey, name: &str, symbol: &str, uri: &str, collection: Option<Pubkey>) -> Self {
        Self {
            mint,
            name: trim_null_chars(name),
            symbol: trim_null_chars(symbol),
            uri: trim_null_chars(uri),
            collection,
        }
    }

    /// Placeholder used when a mint has no metadata account
    pub fn unknown(mint: Pubkey) -> Self {
        Self::new(mint, "", "", "", None)
    }
}

/// Off-chain JSON document referenced by `TokenMetadata::uri`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataFile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub animation_url: Option<String>,
    #[serde(default)]
    pub external_url: Option<String>,
    #[serde(default)]
    pub attributes: Vec<MetadataAttribute>,
    /// Anything else the document carries
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataAttribute {
    pub trait_type: Option<String>,
    pub value: serde_json::Value,
}
