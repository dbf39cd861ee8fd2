//! Boundary to the authoritative ledger
//!
//! Everything the client knows comes through a [`LedgerGateway`]: single
//! account reads, filtered bulk reads, and atomic transaction submission.

mod retry;
mod rpc;

pub use retry::*;
pub use rpc::*;

use anchor_lang::prelude::Pubkey;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solana_sdk::{instruction::Instruction, signer::Signer};

use dexloan_types::{AccountRecord, DexloanResult, OPTION_SOME_TAG};

use crate::pda::{derive_address, DerivedAddress, EntityKind};

/// Raw account as returned by the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAccount {
    pub address: Pubkey,
    pub owner: Pubkey,
    pub lamports: u64,
    pub data: Vec<u8>,
}

/// Structural filter for bulk reads
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountFilter {
    /// Bytes at `offset` must equal `bytes`
    Memcmp { offset: usize, bytes: Vec<u8> },
    /// Account data length must equal the value
    DataSize(u64),
}

impl AccountFilter {
    pub fn memcmp(offset: usize, bytes: impl Into<Vec<u8>>) -> Self {
        Self::Memcmp {
            offset,
            bytes: bytes.into(),
        }
    }

    /// Only accounts of record type `T`
    pub fn discriminator<T: AccountRecord>() -> Self {
        Self::memcmp(0, T::DISCRIMINATOR.to_vec())
    }

    pub fn pubkey(offset: usize, key: &Pubkey) -> Self {
        Self::memcmp(offset, key.to_bytes().to_vec())
    }

    /// An `Option<Pubkey>` field holding `Some(key)`
    pub fn some_pubkey(offset: usize, key: &Pubkey) -> Self {
        let mut bytes = Vec::with_capacity(33);
        bytes.push(OPTION_SOME_TAG);
        bytes.extend_from_slice(key.as_ref());
        Self::memcmp(offset, bytes)
    }

    pub fn byte(offset: usize, value: u8) -> Self {
        Self::memcmp(offset, vec![value])
    }

    /// Evaluate the filter against account data
    pub fn matches(&self, data: &[u8]) -> bool {
        match self {
            Self::Memcmp { offset, bytes } => data
                .get(*offset..offset.saturating_add(bytes.len()))
                .is_some_and(|window| window == bytes.as_slice()),
            Self::DataSize(size) => data.len() as u64 == *size,
        }
    }
}

/// Proof that a submission landed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub signature: String,
    /// Slot of the confirming block, when the node reports it
    pub slot: Option<u64>,
    /// Ledger time of the confirming block; never taken from any other slot
    pub block_time: Option<i64>,
}

/// Read/write access to the authoritative ledger
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Program that owns the Dexloan records
    fn program_id(&self) -> Pubkey;

    /// Derive an address under the Dexloan program
    fn derive_address(&self, kind: EntityKind, seeds: &[&[u8]]) -> DexloanResult<DerivedAddress> {
        derive_address(kind, seeds, &self.program_id())
    }

    /// Single account read; a missing account is `NotFound`
    async fn fetch_account(&self, address: &Pubkey) -> DexloanResult<RawAccount>;

    /// Program accounts matching every filter
    async fn fetch_accounts(&self, filters: &[AccountFilter]) -> DexloanResult<Vec<RawAccount>>;

    /// Sign and submit atomically; never retried here
    async fn submit_mutation(
        &self,
        instructions: &[Instruction],
        signer: &(dyn Signer + Send + Sync),
    ) -> DexloanResult<Confirmation>;
}
