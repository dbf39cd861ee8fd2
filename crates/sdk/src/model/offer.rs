use anchor_lang::prelude::Pubkey;
use serde::{Deserialize, Serialize};

use dexloan_math::{amount_on_maturity, format_apy};
use dexloan_types::{
    serde_helpers::{hex_i64, hex_u64, pubkey_serde},
    AccountRecord, DexloanError, DexloanResult, LoanOfferData, MAX_OFFER_ID,
};

use super::{is_identity, Collection, Entity, Terms};

/// An open offer from a lender to fund any NFT of a collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanOffer {
    #[serde(with = "pubkey_serde")]
    pub address: Pubkey,
    pub data: LoanOfferData,
    pub collection: Collection,
}

/// The terms grouped offers share
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferTerms {
    #[serde(with = "hex_u64")]
    pub amount: u64,
    #[serde(with = "hex_i64")]
    pub duration: i64,
    pub basis_points: u32,
}

/// Open offers with identical terms in one collection, across lenders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedLoanOffer {
    pub terms: OfferTerms,
    pub collection: Collection,
    /// Number of underlying offers, always at least one
    pub count: u32,
}

impl LoanOffer {
    pub fn new(address: Pubkey, data: LoanOfferData, collection: Collection) -> Self {
        Self {
            address,
            data,
            collection,
        }
    }

    pub fn from_account(address: Pubkey, data: &[u8], collection: Collection) -> DexloanResult<Self> {
        Ok(Self::new(address, LoanOfferData::decode(data)?, collection))
    }

    pub fn id(&self) -> u8 {
        self.data.id
    }

    pub fn terms(&self) -> OfferTerms {
        OfferTerms {
            amount: self.data.amount,
            duration: self.data.duration,
            basis_points: self.data.basis_points,
        }
    }

    pub fn is_lender(&self, identity: Option<&Pubkey>) -> bool {
        is_identity(Some(&self.data.lender), identity)
    }

    pub fn amount_on_maturity(&self) -> DexloanResult<u64> {
        amount_on_maturity(self.data.amount, self.data.duration, self.data.basis_points)
    }

    pub fn apy(&self) -> String {
        format_apy(self.data.basis_points)
    }
}

impl Entity for LoanOffer {
    type Changes = ();
    const NAME: &'static str = "loan offer";

    fn address(&self) -> &Pubkey {
        &self.address
    }

    fn changes(&self, _next: &Self) {}

    fn merged(&self, _changes: &()) -> Self {
        self.clone()
    }
}

impl Terms for LoanOffer {
    fn amount(&self) -> u64 {
        self.data.amount
    }

    fn duration(&self) -> i64 {
        self.data.duration
    }

    fn basis_points(&self) -> u32 {
        self.data.basis_points
    }
}

impl GroupedLoanOffer {
    pub fn new(terms: OfferTerms, collection: Collection, count: u32) -> Self {
        Self {
            terms,
            collection,
            count,
        }
    }

    /// Whether an offer belongs to this group
    pub fn contains(&self, terms: &OfferTerms, collection: &Pubkey) -> bool {
        self.terms == *terms && self.collection.address == *collection
    }

    pub fn amount_on_maturity(&self) -> DexloanResult<u64> {
        amount_on_maturity(self.terms.amount, self.terms.duration, self.terms.basis_points)
    }
}

impl Terms for GroupedLoanOffer {
    fn amount(&self) -> u64 {
        self.terms.amount
    }

    fn duration(&self) -> i64 {
        self.terms.duration
    }

    fn basis_points(&self) -> u32 {
        self.terms.basis_points
    }
}

/// Aggregate offers by terms and collection, in first-seen order
pub fn group_offers(offers: &[LoanOffer]) -> Vec<GroupedLoanOffer> {
    let mut groups: Vec<GroupedLoanOffer> = Vec::new();
    for offer in offers {
        let terms = offer.terms();
        match groups
            .iter_mut()
            .find(|g| g.contains(&terms, &offer.collection.address))
        {
            Some(group) => group.count += 1,
            None => groups.push(GroupedLoanOffer::new(terms, offer.collection.clone(), 1)),
        }
    }
    groups
}

/// Lowest offer ids not yet used by a lender in a collection
pub fn pick_offer_ids(existing: &[u8], count: usize) -> DexloanResult<Vec<u8>> {
    let ids: Vec<u8> = (0..=MAX_OFFER_ID)
        .filter(|id| !existing.contains(id))
        .take(count)
        .collect();

    if ids.len() < count {
        return Err(DexloanError::invalid_parameter(
            "count",
            &count.to_string(),
            &format!("at most {} free offer ids", ids.len()),
        ));
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[test]
    fn test_group_offers_merges_equal_terms() {
        let collection = fixtures::collection();
        let a = fixtures::loan_offer(&collection, Pubkey::new_unique(), 0, 1_000, 60, 500);
        let b = fixtures::loan_offer(&collection, Pubkey::new_unique(), 0, 1_000, 60, 500);
        let c = fixtures::loan_offer(&collection, a.data.lender, 1, 2_000, 60, 500);

        let groups = group_offers(&[a.clone(), b, c]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].count, 2);
        assert_eq!(groups[0].terms, a.terms());
        assert_eq!(groups[1].count, 1);
    }

    #[test]
    fn test_groups_are_per_collection() {
        let x = fixtures::collection();
        let y = fixtures::collection();
        let a = fixtures::loan_offer(&x, Pubkey::new_unique(), 0, 1_000, 60, 500);
        let b = fixtures::loan_offer(&y, Pubkey::new_unique(), 0, 1_000, 60, 500);

        let groups = group_offers(&[a, b]);
        assert_eq!(groups.len(), 2);
        assert!(groups.iter().all(|g| g.count == 1));
    }

    #[test]
    fn test_pick_offer_ids() {
        assert_eq!(pick_offer_ids(&[], 3).unwrap(), vec![0, 1, 2]);
        assert_eq!(pick_offer_ids(&[0, 2], 3).unwrap(), vec![1, 3, 4]);

        let all: Vec<u8> = (0..=254).collect();
        assert_eq!(pick_offer_ids(&all, 1).unwrap(), vec![255]);
        assert!(pick_offer_ids(&all, 2).is_err());
    }
}
