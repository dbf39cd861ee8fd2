use anchor_lang::prelude::Pubkey;
use serde::{Deserialize, Serialize};

use dexloan_math::{
    amount_on_maturity, creator_fee, due_date, floor_price, format_apy, has_expired,
    interest_due, interest_on_maturity, loan_to_value, total_due, yield_generated, FloorPrices,
};
use dexloan_types::{
    serde_helpers::pubkey_serde, AccountRecord, DexloanError, DexloanResult, LoanData, LoanState,
};

use super::{is_identity, Collection, Entity, Terms, TokenMetadata};

/// A loan listing or active loan, collateralized by one NFT
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    #[serde(with = "pubkey_serde")]
    pub address: Pubkey,
    pub data: LoanData,
    pub metadata: TokenMetadata,
    pub collection: Collection,
}

/// Fields a loan transition may change
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoanChanges {
    pub state: Option<LoanState>,
    pub lender: Option<Pubkey>,
    pub start_date: Option<i64>,
    pub outstanding: Option<u64>,
}

impl Loan {
    pub fn new(address: Pubkey, data: LoanData, metadata: TokenMetadata, collection: Collection) -> Self {
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
        Ok(Self::new(address, LoanData::decode(data)?, metadata, collection))
    }

    pub fn state(&self) -> LoanState {
        self.data.state
    }

    pub fn is_borrower(&self, identity: Option<&Pubkey>) -> bool {
        is_identity(Some(&self.data.borrower), identity)
    }

    pub fn is_lender(&self, identity: Option<&Pubkey>) -> bool {
        is_identity(self.data.lender.as_ref(), identity)
    }

    /// Due date, once the loan has started
    pub fn due_date(&self) -> Option<i64> {
        self.data
            .start_date
            .and_then(|start| due_date(start, self.data.duration).ok())
    }

    /// Active and past the due date
    pub fn expired(&self, now: i64) -> bool {
        match (self.data.state, self.data.start_date) {
            (LoanState::Active, Some(start)) => {
                has_expired(start, self.data.duration, now).unwrap_or(false)
            }
            _ => false,
        }
    }

    /// Interest owed at `now`, zero before the loan starts
    pub fn interest_due(&self, now: i64) -> DexloanResult<u64> {
        match self.data.start_date {
            Some(start) => interest_due(
                self.data.amount,
                start,
                self.data.duration,
                self.data.basis_points,
                now,
            ),
            None => Ok(0),
        }
    }

    pub fn total_due(&self, now: i64) -> DexloanResult<u64> {
        match self.data.start_date {
            Some(start) => total_due(
                self.data.amount,
                start,
                self.data.duration,
                self.data.basis_points,
                now,
            ),
            None => Ok(self.data.amount),
        }
    }

    pub fn interest_on_maturity(&self) -> DexloanResult<u64> {
        interest_on_maturity(self.data.amount, self.data.duration, self.data.basis_points)
    }

    pub fn amount_on_maturity(&self) -> DexloanResult<u64> {
        amount_on_maturity(self.data.amount, self.data.duration, self.data.basis_points)
    }

    /// Interest earned by the lender so far
    pub fn yield_generated(&self, now: i64) -> DexloanResult<u64> {
        match self.data.start_date {
            Some(start) => yield_generated(self.data.amount, start, self.data.basis_points, now),
            None => Ok(0),
        }
    }

    /// Creator royalty taken from the interest at maturity
    pub fn creator_fee_on_maturity(&self) -> DexloanResult<u64> {
        creator_fee(self.interest_on_maturity()?, self.collection.loan_basis_points())
    }

    pub fn apy(&self) -> String {
        format_apy(self.data.basis_points)
    }

    pub fn floor_price(&self, prices: &FloorPrices) -> Option<u64> {
        floor_price(prices, &self.metadata.symbol)
    }

    pub fn ltv(&self, prices: &FloorPrices) -> Option<f64> {
        loan_to_value(self.data.amount, self.floor_price(prices))
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    fn require_state(&self, expected: LoanState) -> DexloanResult<()> {
        if self.data.state != expected {
            return Err(DexloanError::invalid_state(
                Self::NAME,
                &expected.to_string(),
                &self.data.state.to_string(),
            ));
        }
        Ok(())
    }

    /// Listed -> Active when a lender funds the loan
    pub fn activate(&self, lender: Pubkey, start_date: i64) -> DexloanResult<Self> {
        self.require_state(LoanState::Listed)?;
        let mut next = self.clone();
        next.data.state = LoanState::Active;
        next.data.lender = Some(lender);
        next.data.start_date = Some(start_date);
        Ok(next)
    }

    /// Active -> Repaid on full repayment
    pub fn repaid(&self) -> DexloanResult<Self> {
        self.require_state(LoanState::Active)?;
        let mut next = self.clone();
        next.data.state = LoanState::Repaid;
        next.data.outstanding = 0;
        Ok(next)
    }

    /// Listed -> Cancelled by the borrower
    pub fn cancelled(&self) -> DexloanResult<Self> {
        self.require_state(LoanState::Listed)?;
        let mut next = self.clone();
        next.data.state = LoanState::Cancelled;
        Ok(next)
    }

    /// Active and overdue -> Defaulted when the lender repossesses
    pub fn defaulted(&self, now: i64) -> DexloanResult<Self> {
        self.require_state(LoanState::Active)?;
        if !self.expired(now) {
            return Err(DexloanError::invalid_state(Self::NAME, "overdue", "not overdue"));
        }
        let mut next = self.clone();
        next.data.state = LoanState::Defaulted;
        Ok(next)
    }
}

impl Entity for Loan {
    type Changes = LoanChanges;
    const NAME: &'static str = "loan";

    fn address(&self) -> &Pubkey {
        &self.address
    }

    fn changes(&self, next: &Self) -> LoanChanges {
        LoanChanges {
            state: (next.data.state != self.data.state).then_some(next.data.state),
            lender: next.data.lender.filter(|l| Some(*l) != self.data.lender),
            start_date: next.data.start_date.filter(|s| Some(*s) != self.data.start_date),
            outstanding: (next.data.outstanding != self.data.outstanding)
                .then_some(next.data.outstanding),
        }
    }

    fn merged(&self, changes: &LoanChanges) -> Self {
        let mut next = self.clone();
        if let Some(state) = changes.state {
            next.data.state = state;
        }
        if let Some(lender) = changes.lender {
            next.data.lender = Some(lender);
        }
        if let Some(start_date) = changes.start_date {
            next.data.start_date = Some(start_date);
        }
        if let Some(outstanding) = changes.outstanding {
            next.data.outstanding = outstanding;
        }
        next
    }
}

impl Terms for Loan {
    fn amount(&self) -> u64 {
        self.data.amount
    }

    fn duration(&self) -> i64 {
        self.data.duration
    }

    fn basis_points(&self) -> u32 {
        self.data.basis_points
    }

    fn symbol(&self) -> Option<&str> {
        Some(&self.metadata.symbol)
    }
}
