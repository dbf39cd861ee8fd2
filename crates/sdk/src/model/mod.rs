//! Typed entities built from ledger records and token metadata
//!
//! Entities are immutable snapshots. Lifecycle transitions validate the
//! current state and return a new instance.

mod call_option;
mod collection;
mod hire;
mod loan;
mod metadata;
mod offer;
mod sort;

pub use call_option::*;
pub use collection::*;
pub use hire::*;
pub use loan::*;
pub use metadata::*;
pub use offer::*;
pub use sort::*;

use anchor_lang::prelude::Pubkey;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;

use dexloan_types::{DexloanError, DexloanResult};

/// Behavior shared by every cached entity
pub trait Entity: Clone + Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync {
    /// Field-level delta between two snapshots of the same account
    type Changes: Clone + Debug + PartialEq + Send + Sync;

    /// Entity name used in errors and logs
    const NAME: &'static str;

    fn address(&self) -> &Pubkey;

    /// Fields of `next` that differ from `self`
    fn changes(&self, next: &Self) -> Self::Changes;

    /// Apply a delta, leaving other fields untouched
    fn merged(&self, changes: &Self::Changes) -> Self;

    fn to_json(&self) -> DexloanResult<serde_json::Value> {
        serde_json::to_value(self).map_err(|e| DexloanError::Serialization(e.to_string()))
    }

    fn from_json(value: serde_json::Value) -> DexloanResult<Self> {
        serde_json::from_value(value).map_err(|e| DexloanError::deserialization(Self::NAME, e))
    }
}

/// Public-key equality against an optional identity
pub(crate) fn is_identity(key: Option<&Pubkey>, identity: Option<&Pubkey>) -> bool {
    match (key, identity) {
        (Some(key), Some(identity)) => key == identity,
        _ => false,
    }
}
