//! Query group keys
//!
//! A query group is a parameterized partition of the cache. Each group knows
//! which entities belong to it (`matches`) and how to ask the ledger for them
//! (`filters`), so the same predicate drives both reads and patches.

use anchor_lang::prelude::Pubkey;
use std::fmt;

use dexloan_types::{
    CallOptionData, CallOptionState, HireData, HireState, LoanData, LoanOfferData, LoanState,
};

use crate::{
    gateway::AccountFilter,
    model::{CallOption, GroupedLoanOffer, Hire, Loan, LoanOffer, OfferTerms, SortOrder},
};

/// Prefix shared by every key of one shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Loans,
    Loan,
    LoanOffers,
    GroupedLoanOffers,
    CallOptions,
    CallOption,
    Hires,
    Hire,
}

impl QueryKind {
    pub const ALL: [QueryKind; 8] = [
        Self::Loans,
        Self::Loan,
        Self::LoanOffers,
        Self::GroupedLoanOffers,
        Self::CallOptions,
        Self::CallOption,
        Self::Hires,
        Self::Hire,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Loans => "loans",
            Self::Loan => "loan",
            Self::LoanOffers => "loan_offers",
            Self::GroupedLoanOffers => "loan_offers_grouped",
            Self::CallOptions => "call_options",
            Self::CallOption => "call_option",
            Self::Hires => "hires",
            Self::Hire => "hire",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Loans filtered by state, collection and wallet role
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LoanQuery {
    pub state: Option<LoanState>,
    pub collection: Option<Pubkey>,
    pub borrower: Option<Pubkey>,
    pub lender: Option<Pubkey>,
    pub sort: SortOrder,
}

impl LoanQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_state(mut self, state: LoanState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_collection(mut self, collection: Pubkey) -> Self {
        self.collection = Some(collection);
        self
    }

    pub fn with_borrower(mut self, borrower: Pubkey) -> Self {
        self.borrower = Some(borrower);
        self
    }

    pub fn with_lender(mut self, lender: Pubkey) -> Self {
        self.lender = Some(lender);
        self
    }

    pub fn sorted_by(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    pub fn matches(&self, loan: &Loan) -> bool {
        self.state.map_or(true, |s| loan.data.state == s)
            && self.collection.map_or(true, |c| loan.data.collection == c)
            && self.borrower.map_or(true, |b| loan.data.borrower == b)
            && self.lender.map_or(true, |l| loan.data.lender == Some(l))
    }

    pub fn filters(&self) -> Vec<AccountFilter> {
        let mut filters = vec![AccountFilter::discriminator::<LoanData>()];
        if let Some(state) = self.state {
            filters.push(AccountFilter::byte(LoanData::STATE_OFFSET, state.as_byte()));
        }
        if let Some(collection) = &self.collection {
            filters.push(AccountFilter::pubkey(LoanData::COLLECTION_OFFSET, collection));
        }
        if let Some(borrower) = &self.borrower {
            filters.push(AccountFilter::pubkey(LoanData::BORROWER_OFFSET, borrower));
        }
        if let Some(lender) = &self.lender {
            filters.push(AccountFilter::some_pubkey(LoanData::LENDER_OFFSET, lender));
        }
        filters
    }
}

/// Individual loan offers
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct OfferQuery {
    pub collection: Option<Pubkey>,
    pub lender: Option<Pubkey>,
    pub terms: Option<OfferTerms>,
    pub sort: SortOrder,
}

impl OfferQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_collection(mut self, collection: Pubkey) -> Self {
        self.collection = Some(collection);
        self
    }

    pub fn with_lender(mut self, lender: Pubkey) -> Self {
        self.lender = Some(lender);
        self
    }

    pub fn with_terms(mut self, terms: OfferTerms) -> Self {
        self.terms = Some(terms);
        self
    }

    pub fn sorted_by(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    pub fn matches(&self, offer: &LoanOffer) -> bool {
        self.collection.map_or(true, |c| offer.data.collection == c)
            && self.lender.map_or(true, |l| offer.data.lender == l)
            && self.terms.map_or(true, |t| offer.terms() == t)
    }

    pub fn filters(&self) -> Vec<AccountFilter> {
        let mut filters = vec![AccountFilter::discriminator::<LoanOfferData>()];
        if let Some(collection) = &self.collection {
            filters.push(AccountFilter::pubkey(LoanOfferData::COLLECTION_OFFSET, collection));
        }
        if let Some(lender) = &self.lender {
            filters.push(AccountFilter::pubkey(LoanOfferData::LENDER_OFFSET, lender));
        }
        if let Some(terms) = &self.terms {
            filters.push(AccountFilter::memcmp(
                LoanOfferData::AMOUNT_OFFSET,
                terms.amount.to_le_bytes().to_vec(),
            ));
            filters.push(AccountFilter::memcmp(
                LoanOfferData::DURATION_OFFSET,
                terms.duration.to_le_bytes().to_vec(),
            ));
            filters.push(AccountFilter::memcmp(
                LoanOfferData::BASIS_POINTS_OFFSET,
                terms.basis_points.to_le_bytes().to_vec(),
            ));
        }
        filters
    }
}

/// Offers aggregated by terms and collection
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct GroupedOfferQuery {
    pub collection: Option<Pubkey>,
    pub sort: SortOrder,
}

impl GroupedOfferQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_collection(mut self, collection: Pubkey) -> Self {
        self.collection = Some(collection);
        self
    }

    pub fn sorted_by(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    pub fn matches(&self, group: &GroupedLoanOffer) -> bool {
        self.matches_collection(&group.collection.address)
    }

    pub fn matches_collection(&self, collection: &Pubkey) -> bool {
        self.collection.map_or(true, |c| c == *collection)
    }

    /// The underlying offers are fetched and grouped client-side
    pub fn offers(&self) -> OfferQuery {
        OfferQuery {
            collection: self.collection,
            ..OfferQuery::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CallOptionQuery {
    pub state: Option<CallOptionState>,
    pub collection: Option<Pubkey>,
    pub seller: Option<Pubkey>,
    pub buyer: Option<Pubkey>,
}

impl CallOptionQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_state(mut self, state: CallOptionState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_collection(mut self, collection: Pubkey) -> Self {
        self.collection = Some(collection);
        self
    }

    pub fn with_seller(mut self, seller: Pubkey) -> Self {
        self.seller = Some(seller);
        self
    }

    pub fn with_buyer(mut self, buyer: Pubkey) -> Self {
        self.buyer = Some(buyer);
        self
    }

    pub fn matches(&self, option: &CallOption) -> bool {
        self.state.map_or(true, |s| option.data.state == s)
            && self.collection.map_or(true, |c| option.data.collection == c)
            && self.seller.map_or(true, |s| option.data.seller == s)
            && self.buyer.map_or(true, |b| option.data.buyer == Some(b))
    }

    pub fn filters(&self) -> Vec<AccountFilter> {
        let mut filters = vec![AccountFilter::discriminator::<CallOptionData>()];
        if let Some(state) = self.state {
            filters.push(AccountFilter::byte(CallOptionData::STATE_OFFSET, state.as_byte()));
        }
        if let Some(collection) = &self.collection {
            filters.push(AccountFilter::pubkey(CallOptionData::COLLECTION_OFFSET, collection));
        }
        if let Some(seller) = &self.seller {
            filters.push(AccountFilter::pubkey(CallOptionData::SELLER_OFFSET, seller));
        }
        if let Some(buyer) = &self.buyer {
            filters.push(AccountFilter::some_pubkey(CallOptionData::BUYER_OFFSET, buyer));
        }
        filters
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct HireQuery {
    pub state: Option<HireState>,
    pub collection: Option<Pubkey>,
    pub lender: Option<Pubkey>,
    pub borrower: Option<Pubkey>,
}

impl HireQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_state(mut self, state: HireState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_collection(mut self, collection: Pubkey) -> Self {
        self.collection = Some(collection);
        self
    }

    pub fn with_lender(mut self, lender: Pubkey) -> Self {
        self.lender = Some(lender);
        self
    }

    pub fn with_borrower(mut self, borrower: Pubkey) -> Self {
        self.borrower = Some(borrower);
        self
    }

    pub fn matches(&self, hire: &Hire) -> bool {
        self.state.map_or(true, |s| hire.data.state == s)
            && self.collection.map_or(true, |c| hire.data.collection == c)
            && self.lender.map_or(true, |l| hire.data.lender == l)
            && self.borrower.map_or(true, |b| hire.data.borrower == Some(b))
    }

    pub fn filters(&self) -> Vec<AccountFilter> {
        let mut filters = vec![AccountFilter::discriminator::<HireData>()];
        if let Some(state) = self.state {
            filters.push(AccountFilter::byte(HireData::STATE_OFFSET, state.as_byte()));
        }
        if let Some(collection) = &self.collection {
            filters.push(AccountFilter::pubkey(HireData::COLLECTION_OFFSET, collection));
        }
        if let Some(lender) = &self.lender {
            filters.push(AccountFilter::pubkey(HireData::LENDER_OFFSET, lender));
        }
        if let Some(borrower) = &self.borrower {
            filters.push(AccountFilter::some_pubkey(HireData::BORROWER_OFFSET, borrower));
        }
        filters
    }
}

/// Typed cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryGroup {
    Loans(LoanQuery),
    Loan(Pubkey),
    LoanOffers(OfferQuery),
    GroupedLoanOffers(GroupedOfferQuery),
    CallOptions(CallOptionQuery),
    CallOption(Pubkey),
    Hires(HireQuery),
    Hire(Pubkey),
}

impl QueryGroup {
    pub fn kind(&self) -> QueryKind {
        match self {
            Self::Loans(_) => QueryKind::Loans,
            Self::Loan(_) => QueryKind::Loan,
            Self::LoanOffers(_) => QueryKind::LoanOffers,
            Self::GroupedLoanOffers(_) => QueryKind::GroupedLoanOffers,
            Self::CallOptions(_) => QueryKind::CallOptions,
            Self::CallOption(_) => QueryKind::CallOption,
            Self::Hires(_) => QueryKind::Hires,
            Self::Hire(_) => QueryKind::Hire,
        }
    }
}

impl fmt::Display for QueryGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loan(address) | Self::CallOption(address) | Self::Hire(address) => {
                write!(f, "{}:{}", self.kind(), address)
            }
            other => write!(f, "{}:{:?}", other.kind(), other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;
    use dexloan_types::AccountRecord;

    #[test]
    fn test_loan_query_filters_agree_with_matcher() {
        let loan = fixtures::listed_loan(1_000, 100, 60);
        let data = loan.data.encode().unwrap();

        let hit = LoanQuery::all()
            .with_state(LoanState::Listed)
            .with_collection(loan.data.collection)
            .with_borrower(loan.data.borrower);
        assert!(hit.matches(&loan));
        assert!(hit.filters().iter().all(|f| f.matches(&data)));

        let miss = LoanQuery::all().with_lender(loan.data.borrower);
        assert!(!miss.matches(&loan));
        assert!(!miss.filters().iter().all(|f| f.matches(&data)));
    }

    #[test]
    fn test_offer_query_terms_filter() {
        let collection = fixtures::collection();
        let offer = fixtures::loan_offer(&collection, Pubkey::new_unique(), 4, 1_000, 60, 500);
        let data = offer.data.encode().unwrap();

        let query = OfferQuery::all().with_terms(offer.terms());
        assert!(query.matches(&offer));
        assert!(query.filters().iter().all(|f| f.matches(&data)));

        let other = OfferQuery::all().with_terms(OfferTerms {
            amount: 999,
            ..offer.terms()
        });
        assert!(!other.matches(&offer));
        assert!(!other.filters().iter().all(|f| f.matches(&data)));
    }

    #[test]
    fn test_hire_query_borrower_filter() {
        let hire = fixtures::listed_hire(100, 10 * 86_400);
        let data = hire.data.encode().unwrap();
        let query = HireQuery::all().with_borrower(Pubkey::new_unique());
        assert!(!query.matches(&hire));
        assert!(!query.filters().iter().all(|f| f.matches(&data)));
        assert!(HireQuery::all().filters().iter().all(|f| f.matches(&data)));
    }

    #[test]
    fn test_group_kinds() {
        assert_eq!(QueryGroup::Loans(LoanQuery::all()).kind(), QueryKind::Loans);
        assert_eq!(QueryGroup::Hire(Pubkey::default()).kind(), QueryKind::Hire);
        assert_eq!(QueryKind::GroupedLoanOffers.to_string(), "loan_offers_grouped");
    }
}
