//! Program-derived addresses for every Dexloan account

use anchor_lang::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use dexloan_types::{seeds, DexloanError, DexloanResult, METADATA_PROGRAM_ID};

/// Kinds of derived accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Loan,
    LoanOffer,
    CallOption,
    Hire,
    HireEscrow,
    Collection,
    Metadata,
    Edition,
}

impl EntityKind {
    /// Literal seed that leads every derivation of this kind
    pub fn tag(self) -> &'static [u8] {
        match self {
            Self::Loan => seeds::LOAN,
            Self::LoanOffer => seeds::LOAN_OFFER,
            Self::CallOption => seeds::CALL_OPTION,
            Self::Hire => seeds::HIRE,
            Self::HireEscrow => seeds::HIRE_ESCROW,
            Self::Collection => seeds::COLLECTION,
            Self::Metadata | Self::Edition => seeds::METADATA,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Loan => "loan",
            Self::LoanOffer => "loan_offer",
            Self::CallOption => "call_option",
            Self::Hire => "hire",
            Self::HireEscrow => "hire_escrow",
            Self::Collection => "collection",
            Self::Metadata => "metadata",
            Self::Edition => "edition",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A derived address with the bump that makes it fall off the curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DerivedAddress {
    pub address: Pubkey,
    pub bump: u8,
}

/// Derive an address from the full ordered seed list
///
/// Searches bumps 255 down to 0. Exhausting the range is a configuration
/// error and is never retried.
pub fn derive_address(
    kind: EntityKind,
    seeds: &[&[u8]],
    program_id: &Pubkey,
) -> DexloanResult<DerivedAddress> {
    Pubkey::try_find_program_address(seeds, program_id)
        .map(|(address, bump)| DerivedAddress { address, bump })
        .ok_or_else(|| DexloanError::DerivationExhausted {
            kind: kind.to_string(),
        })
}

/// Memo of derived addresses keyed by kind and seed values
#[derive(Default)]
pub struct PdaCache {
    cache: RwLock<HashMap<String, DerivedAddress>>,
}

impl PdaCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compute<F>(&self, key: &str, compute: F) -> DexloanResult<DerivedAddress>
    where
        F: FnOnce() -> DexloanResult<DerivedAddress>,
    {
        if let Some(cached) = self.cache.read().ok().and_then(|c| c.get(key).copied()) {
            return Ok(cached);
        }

        let result = compute()?;
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(key.to_string(), result);
        }
        Ok(result)
    }

    pub fn len(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Typed derivations for every Dexloan account
///
/// The program id is fixed at construction; cached addresses belong to it.
pub struct PdaBuilder {
    cache: PdaCache,
    program_id: Pubkey,
}

impl PdaBuilder {
    pub fn new(program_id: Pubkey) -> Self {
        Self {
            cache: PdaCache::new(),
            program_id,
        }
    }

    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }

    pub fn loan(&self, mint: &Pubkey, borrower: &Pubkey) -> DexloanResult<DerivedAddress> {
        let key = format!("loan:{}:{}", mint, borrower);
        self.cache.get_or_compute(&key, || {
            derive_address(
                EntityKind::Loan,
                &[seeds::LOAN, mint.as_ref(), borrower.as_ref()],
                &self.program_id,
            )
        })
    }

    pub fn loan_offer(
        &self,
        collection: &Pubkey,
        lender: &Pubkey,
        id: u8,
    ) -> DexloanResult<DerivedAddress> {
        let key = format!("loan_offer:{}:{}:{}", collection, lender, id);
        self.cache.get_or_compute(&key, || {
            derive_address(
                EntityKind::LoanOffer,
                &[seeds::LOAN_OFFER, collection.as_ref(), lender.as_ref(), &[id]],
                &self.program_id,
            )
        })
    }

    pub fn call_option(&self, mint: &Pubkey, seller: &Pubkey) -> DexloanResult<DerivedAddress> {
        let key = format!("call_option:{}:{}", mint, seller);
        self.cache.get_or_compute(&key, || {
            derive_address(
                EntityKind::CallOption,
                &[seeds::CALL_OPTION, mint.as_ref(), seller.as_ref()],
                &self.program_id,
            )
        })
    }

    pub fn hire(&self, mint: &Pubkey, lender: &Pubkey) -> DexloanResult<DerivedAddress> {
        let key = format!("hire:{}:{}", mint, lender);
        self.cache.get_or_compute(&key, || {
            derive_address(
                EntityKind::Hire,
                &[seeds::HIRE, mint.as_ref(), lender.as_ref()],
                &self.program_id,
            )
        })
    }

    pub fn hire_escrow(&self, mint: &Pubkey, lender: &Pubkey) -> DexloanResult<DerivedAddress> {
        let key = format!("hire_escrow:{}:{}", mint, lender);
        self.cache.get_or_compute(&key, || {
            derive_address(
                EntityKind::HireEscrow,
                &[seeds::HIRE_ESCROW, mint.as_ref(), lender.as_ref()],
                &self.program_id,
            )
        })
    }

    pub fn collection(&self, collection_mint: &Pubkey) -> DexloanResult<DerivedAddress> {
        let key = format!("collection:{}", collection_mint);
        self.cache.get_or_compute(&key, || {
            derive_address(
                EntityKind::Collection,
                &[seeds::COLLECTION, collection_mint.as_ref()],
                &self.program_id,
            )
        })
    }

    /// Token metadata account, owned by the metadata program
    pub fn metadata(&self, mint: &Pubkey) -> DexloanResult<DerivedAddress> {
        let key = format!("metadata:{}", mint);
        self.cache.get_or_compute(&key, || {
            derive_address(
                EntityKind::Metadata,
                &[seeds::METADATA, METADATA_PROGRAM_ID.as_ref(), mint.as_ref()],
                &METADATA_PROGRAM_ID,
            )
        })
    }

    /// Master edition account, owned by the metadata program
    pub fn edition(&self, mint: &Pubkey) -> DexloanResult<DerivedAddress> {
        let key = format!("edition:{}", mint);
        self.cache.get_or_compute(&key, || {
            derive_address(
                EntityKind::Edition,
                &[
                    seeds::METADATA,
                    METADATA_PROGRAM_ID.as_ref(),
                    mint.as_ref(),
                    seeds::EDITION,
                ],
                &METADATA_PROGRAM_ID,
            )
        })
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dexloan_types::PROGRAM_ID;

    #[test]
    fn test_derivation_is_deterministic() {
        let mint = Pubkey::new_unique();
        let borrower = Pubkey::new_unique();

        let a = PdaBuilder::new(PROGRAM_ID).loan(&mint, &borrower).unwrap();
        let b = PdaBuilder::new(PROGRAM_ID).loan(&mint, &borrower).unwrap();
        assert_eq!(a, b);

        let (expected, bump) = Pubkey::find_program_address(
            &[b"loan", mint.as_ref(), borrower.as_ref()],
            &PROGRAM_ID,
        );
        assert_eq!(a.address, expected);
        assert_eq!(a.bump, bump);
    }

    #[test]
    fn test_builder_memoizes() {
        let pda = PdaBuilder::new(PROGRAM_ID);
        let mint = Pubkey::new_unique();
        let seller = Pubkey::new_unique();

        pda.call_option(&mint, &seller).unwrap();
        pda.call_option(&mint, &seller).unwrap();
        assert_eq!(pda.cached_len(), 1);
    }

    #[test]
    fn test_addresses_belong_to_builder_program() {
        let other_program = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let borrower = Pubkey::new_unique();

        let dexloan = PdaBuilder::new(PROGRAM_ID);
        let other = PdaBuilder::new(other_program);
        assert_eq!(other.program_id(), other_program);
        assert_ne!(
            dexloan.loan(&mint, &borrower).unwrap().address,
            other.loan(&mint, &borrower).unwrap().address
        );
    }

    #[test]
    fn test_offer_ids_yield_distinct_addresses() {
        let pda = PdaBuilder::new(PROGRAM_ID);
        let collection = Pubkey::new_unique();
        let lender = Pubkey::new_unique();

        let first = pda.loan_offer(&collection, &lender, 0).unwrap();
        let second = pda.loan_offer(&collection, &lender, 1).unwrap();
        assert_ne!(first.address, second.address);
    }

    #[test]
    fn test_metadata_uses_metadata_program() {
        let pda = PdaBuilder::new(PROGRAM_ID);
        let mint = Pubkey::new_unique();
        let (expected, _) = Pubkey::find_program_address(
            &[b"metadata", METADATA_PROGRAM_ID.as_ref(), mint.as_ref()],
            &METADATA_PROGRAM_ID,
        );
        assert_eq!(pda.metadata(&mint).unwrap().address, expected);
        assert_ne!(pda.edition(&mint).unwrap().address, expected);
    }

    #[test]
    fn test_kind_tags() {
        assert_eq!(EntityKind::LoanOffer.tag(), b"loan_offer");
        assert_eq!(EntityKind::Edition.tag(), b"metadata");
        assert_eq!(EntityKind::HireEscrow.to_string(), "hire_escrow");
    }
}
