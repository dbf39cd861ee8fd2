use anchor_lang::prelude::Pubkey;
use serde::{Deserialize, Serialize};

use dexloan_math::{hire_cost, max_hire_days, safe_add_i64, safe_add_u64, safe_mul_u64, validate_hire_days};
use dexloan_types::{
    serde_helpers::pubkey_serde, AccountRecord, DexloanError, DexloanResult, HireData, HireState,
    SECONDS_PER_DAY,
};

use super::{is_identity, Collection, Entity, TokenMetadata};

/// Use-rights to an NFT rented out by the day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hire {
    #[serde(with = "pubkey_serde")]
    pub address: Pubkey,
    pub data: HireData,
    pub metadata: TokenMetadata,
    pub collection: Collection,
}

/// Where a hire sits relative to `now`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HireStatus {
    /// Available to hire
    Listed,
    /// Hired and the current period has not ended
    Active,
    /// Hired but the current period has ended
    Lapsed,
}

/// Fields a hire transition may change; `Some(None)` clears a field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HireChanges {
    pub state: Option<HireState>,
    pub borrower: Option<Option<Pubkey>>,
    pub current_start: Option<Option<i64>>,
    pub current_expiry: Option<Option<i64>>,
    pub escrow_balance: Option<u64>,
}

impl Hire {
    pub fn new(address: Pubkey, data: HireData, metadata: TokenMetadata, collection: Collection) -> Self {
        Self {
            address,
            data,
            metadata,
            collection,
        }
    }

    pub fn from_account(
        address: Pubkey,
        data: &[u8],
        metadata: TokenMetadata,
        collection: Collection,
    ) -> DexloanResult<Self> {
        Ok(Self::new(address, HireData::decode(data)?, metadata, collection))
    }

    pub fn state(&self) -> HireState {
        self.data.state
    }

    pub fn status(&self, now: i64) -> HireStatus {
        match (self.data.state, self.data.current_expiry) {
            (HireState::Listed, _) => HireStatus::Listed,
            (HireState::Hired, Some(expiry)) if expiry > now => HireStatus::Active,
            (HireState::Hired, _) => HireStatus::Lapsed,
        }
    }

    pub fn is_lender(&self, identity: Option<&Pubkey>) -> bool {
        is_identity(Some(&self.data.lender), identity)
    }

    pub fn is_borrower(&self, identity: Option<&Pubkey>) -> bool {
        is_identity(self.data.borrower.as_ref(), identity)
    }

    /// Whole days still available before the listing expires
    pub fn max_days(&self, now: i64) -> u64 {
        max_hire_days(self.data.expiry, now).unwrap_or(0)
    }

    pub fn cost(&self, days: u64) -> DexloanResult<u64> {
        hire_cost(self.data.amount, days)
    }

    /// The lender can close once nobody holds a running period
    pub fn can_close(&self, now: i64) -> bool {
        self.status(now) != HireStatus::Active
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Start a hire period of `days` for `borrower`
    pub fn taken(&self, borrower: Pubkey, days: u64, now: i64) -> DexloanResult<Self> {
        let status = self.status(now);
        if status == HireStatus::Active {
            return Err(DexloanError::invalid_state(Self::NAME, "Listed or Lapsed", "Active"));
        }

        // A listing may be reserved for a single borrower
        if let (HireStatus::Listed, Some(reserved)) = (status, self.data.borrower) {
            if reserved != borrower {
                return Err(DexloanError::invalid_parameter(
                    "borrower",
                    &borrower.to_string(),
                    &reserved.to_string(),
                ));
            }
        }

        let days = validate_hire_days(days, self.max_days(now))?;
        let period = safe_mul_u64(days, SECONDS_PER_DAY as u64)?;
        let period = i64::try_from(period)
            .map_err(|_| DexloanError::numerical_overflow("hire period", &[&period.to_string()]))?;

        let mut next = self.clone();
        next.data.state = HireState::Hired;
        next.data.borrower = Some(borrower);
        next.data.current_start = Some(now);
        next.data.current_expiry = Some(safe_add_i64(now, period)?);
        next.data.escrow_balance = safe_add_u64(self.data.escrow_balance, self.cost(days)?)?;
        Ok(next)
    }

    /// Return a lapsed hire to the lender
    pub fn recovered(&self, now: i64) -> DexloanResult<Self> {
        let status = self.status(now);
        if status != HireStatus::Lapsed {
            return Err(DexloanError::invalid_state(
                Self::NAME,
                "Lapsed",
                &format!("{:?}", status),
            ));
        }

        let mut next = self.clone();
        next.data.state = HireState::Listed;
        next.data.borrower = None;
        next.data.current_start = None;
        next.data.current_expiry = None;
        Ok(next)
    }
}

impl Entity for Hire {
    type Changes = HireChanges;
    const NAME: &'static str = "hire";

    fn address(&self) -> &Pubkey {
        &self.address
    }

    fn changes(&self, next: &Self) -> HireChanges {
        HireChanges {
            state: (next.data.state != self.data.state).then_some(next.data.state),
            borrower: (next.data.borrower != self.data.borrower).then_some(next.data.borrower),
            current_start: (next.data.current_start != self.data.current_start)
                .then_some(next.data.current_start),
            current_expiry: (next.data.current_expiry != self.data.current_expiry)
                .then_some(next.data.current_expiry),
            escrow_balance: (next.data.escrow_balance != self.data.escrow_balance)
                .then_some(next.data.escrow_balance),
        }
    }

    fn merged(&self, changes: &HireChanges) -> Self {
        let mut next = self.clone();
        if let Some(state) = changes.state {
            next.data.state = state;
        }
        if let Some(borrower) = changes.borrower {
            next.data.borrower = borrower;
        }
        if let Some(current_start) = changes.current_start {
            next.data.current_start = current_start;
        }
        if let Some(current_expiry) = changes.current_expiry {
            next.data.current_expiry = current_expiry;
        }
        if let Some(escrow_balance) = changes.escrow_balance {
            next.data.escrow_balance = escrow_balance;
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    const DAY: i64 = SECONDS_PER_DAY;

    #[test]
    fn test_take_and_recover() {
        let hire = fixtures::listed_hire(1_000, 10 * DAY);
        assert_eq!(hire.status(0), HireStatus::Listed);
        assert_eq!(hire.max_days(0), 10);

        let borrower = Pubkey::new_unique();
        let taken = hire.taken(borrower, 3, 0).unwrap();
        assert_eq!(taken.status(0), HireStatus::Active);
        assert_eq!(taken.data.current_expiry, Some(3 * DAY));
        assert_eq!(taken.data.escrow_balance, 3_000);
        assert!(taken.is_borrower(Some(&borrower)));

        assert!(taken.recovered(DAY).is_err());
        assert_eq!(taken.status(3 * DAY), HireStatus::Lapsed);

        let recovered = taken.recovered(3 * DAY).unwrap();
        assert_eq!(recovered.status(3 * DAY), HireStatus::Listed);
        assert_eq!(recovered.data.borrower, None);
        assert_eq!(taken.merged(&taken.changes(&recovered)), recovered);
    }

    #[test]
    fn test_days_must_fit_listing() {
        let hire = fixtures::listed_hire(1_000, 2 * DAY + 5);
        assert!(hire.taken(Pubkey::new_unique(), 3, 0).is_err());
        assert!(hire.taken(Pubkey::new_unique(), 0, 0).is_err());
        assert!(hire.taken(Pubkey::new_unique(), 2, 0).is_ok());
    }

    #[test]
    fn test_reserved_listing() {
        let mut hire = fixtures::listed_hire(1_000, 5 * DAY);
        let reserved = Pubkey::new_unique();
        hire.data.borrower = Some(reserved);

        assert!(hire.taken(Pubkey::new_unique(), 1, 0).is_err());
        assert!(hire.taken(reserved, 1, 0).is_ok());
    }

    #[test]
    fn test_active_hire_cannot_close() {
        let hire = fixtures::listed_hire(1_000, 5 * DAY);
        let taken = hire.taken(Pubkey::new_unique(), 1, 0).unwrap();
        assert!(!taken.can_close(10));
        assert!(taken.can_close(DAY));
        assert!(hire.can_close(0));
    }
}
