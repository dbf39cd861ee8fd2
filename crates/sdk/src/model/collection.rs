use anchor_lang::prelude::Pubkey;
use serde::{Deserialize, Serialize};

use dexloan_types::{serde_helpers::pubkey_serde, AccountRecord, CollectionData, DexloanResult};

/// A whitelisted NFT collection
///
/// Immutable once fetched; refreshed only by re-fetching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    #[serde(with = "pubkey_serde")]
    pub address: Pubkey,
    pub data: CollectionData,
}

impl Collection {
    pub fn new(address: Pubkey, data: CollectionData) -> Self {
        Self { address, data }
    }

    pub fn from_account(address: Pubkey, data: &[u8]) -> DexloanResult<Self> {
        Ok(Self::new(address, CollectionData::decode(data)?))
    }

    pub fn mint(&self) -> &Pubkey {
        &self.data.mint
    }

    /// Creator royalty on loan interest
    pub fn loan_basis_points(&self) -> u16 {
        self.data.loan_basis_points
    }

    pub fn option_basis_points(&self) -> u16 {
        self.data.option_basis_points
    }
}
