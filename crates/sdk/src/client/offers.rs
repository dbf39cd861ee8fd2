//! Standing loan offers from lenders

use anchor_lang::prelude::Pubkey;
use solana_sdk::signer::Signer;
use tracing::{debug, instrument};

use dexloan_types::{DexloanError, DexloanResult, LoanData, LoanOfferData, LoanState};

use super::{loans::validate_terms, DexloanClient};
use crate::{
    cache::{EntitySnapshot, MutationPlan, OfferQuery, Patch},
    gateway::Confirmation,
    model::{pick_offer_ids, GroupedLoanOffer, Loan, LoanOffer, OfferTerms},
    pda::EntityKind,
};

/// Patches that take one offer out of every list and group
fn withdraw(offer: &LoanOffer) -> [Patch; 2] {
    [
        Patch::Remove {
            kind: EntityKind::LoanOffer,
            address: offer.address,
        },
        Patch::LeaveGroup {
            terms: offer.terms(),
            collection: offer.collection.address,
        },
    ]
}

impl DexloanClient {
    /// Publish `count` identical offers against a collection
    #[instrument(skip(self))]
    pub async fn offer_loan(
        &self,
        collection_mint: Pubkey,
        terms: OfferTerms,
        count: u32,
    ) -> DexloanResult<Confirmation> {
        let plan = self.plan_offer_loan(collection_mint, terms, count).await;
        self.settle(plan).await
    }

    async fn plan_offer_loan(
        &self,
        collection_mint: Pubkey,
        terms: OfferTerms,
        count: u32,
    ) -> DexloanResult<MutationPlan> {
        let lender = self.identity()?.pubkey();
        validate_terms(&terms)?;
        if count == 0 {
            return Err(DexloanError::invalid_parameter("count", "0", "at least one offer"));
        }

        let collection = self.collection(&collection_mint).await?;

        // Ids in use come from the ledger, not the cache
        let existing: Vec<u8> = self
            .fetch_offers(
                &OfferQuery::all()
                    .with_collection(collection.address)
                    .with_lender(lender),
            )
            .await?
            .iter()
            .map(LoanOffer::id)
            .collect();
        let ids = pick_offer_ids(&existing, count as usize)?;
        debug!(?ids, existing = existing.len(), "picked offer ids");

        let instructions = self.offers.offer_loan(
            lender,
            collection.address,
            terms.amount,
            terms.basis_points,
            terms.duration,
            &ids,
        )?;

        let mut plan = MutationPlan::new("offer_loan", "Loan offer(s) created", instructions);
        for &id in &ids {
            let derived = self.pda.loan_offer(&collection.address, &lender, id)?;
            let offer = LoanOffer::new(
                derived.address,
                LoanOfferData {
                    collection: collection.address,
                    lender,
                    id,
                    amount: terms.amount,
                    duration: terms.duration,
                    basis_points: terms.basis_points,
                    bump: derived.bump,
                },
                collection.clone(),
            );
            plan = plan.with_speculative(Patch::Upsert(EntitySnapshot::LoanOffer(offer)));
        }

        Ok(plan.with_speculative(Patch::JoinGroup(GroupedLoanOffer::new(
            terms,
            collection,
            ids.len() as u32,
        ))))
    }

    /// Accept an offer by locking `mint` as collateral
    #[instrument(skip(self, offer), fields(offer = %offer.address))]
    pub async fn take_loan(&self, offer: &LoanOffer, mint: Pubkey) -> DexloanResult<Confirmation> {
        let plan = self.plan_take_loan(offer, mint).await;
        self.settle(plan).await
    }

    async fn plan_take_loan(&self, offer: &LoanOffer, mint: Pubkey) -> DexloanResult<MutationPlan> {
        let borrower = self.identity()?.pubkey();
        let metadata = self.metadata.metadata_or_unknown(&mint).await?;
        if metadata
            .collection
            .is_some_and(|collection| collection != offer.collection.data.mint)
        {
            return Err(DexloanError::invalid_parameter(
                "mint",
                &mint.to_string(),
                "an NFT from the offer's collection",
            ));
        }

        let instruction = self.offers.take_loan(
            borrower,
            offer.data.lender,
            offer.collection.address,
            mint,
            offer.data.id,
        )?;
        let derived = self.pda.loan(&mint, &borrower)?;

        let [remove, leave] = withdraw(offer);
        let offer = offer.clone();
        Ok(MutationPlan::new("take_loan", "Loan taken", vec![instruction])
            .with_speculative(remove)
            .with_speculative(leave)
            .with_on_confirm(move |ledger_time| {
                let loan = Loan::new(
                    derived.address,
                    LoanData {
                        state: LoanState::Active,
                        collection: offer.collection.address,
                        borrower,
                        lender: Some(offer.data.lender),
                        amount: offer.data.amount,
                        outstanding: offer.data.amount,
                        basis_points: offer.data.basis_points,
                        duration: offer.data.duration,
                        start_date: Some(ledger_time),
                        mint,
                        bump: derived.bump,
                    },
                    metadata,
                    offer.collection,
                );
                vec![Patch::Upsert(EntitySnapshot::Loan(loan))]
            }))
    }

    #[instrument(skip(self, offer), fields(offer = %offer.address))]
    pub async fn close_offer(&self, offer: &LoanOffer) -> DexloanResult<Confirmation> {
        let plan = self.plan_close_offer(offer);
        self.settle(plan).await
    }

    fn plan_close_offer(&self, offer: &LoanOffer) -> DexloanResult<MutationPlan> {
        let lender = self.identity()?.pubkey();
        if !offer.is_lender(Some(&lender)) {
            return Err(DexloanError::invalid_parameter(
                "offer",
                &offer.address.to_string(),
                "an offer made by the connected identity",
            ));
        }

        let instruction = self
            .offers
            .close_offer(lender, offer.collection.address, offer.data.id)?;
        let [remove, leave] = withdraw(offer);

        Ok(MutationPlan::new("close_offer", "Offer closed", vec![instruction])
            .with_speculative(remove)
            .with_speculative(leave))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{GroupedOfferQuery, LoanQuery, QueryGroup};
    use crate::client::harness::harness;
    use crate::testing::fixtures;

    fn terms() -> OfferTerms {
        OfferTerms {
            amount: 2_000_000_000,
            duration: 14 * 86_400,
            basis_points: 1_500,
        }
    }

    #[tokio::test]
    async fn test_offer_loan_skips_ids_in_use() {
        let h = harness();
        let collection = fixtures::collection();
        h.gateway
            .insert_record(collection.address, &collection.data)
            .unwrap();
        for id in [0u8, 2] {
            let offer = fixtures::loan_offer(&collection, h.identity, id, 1, 86_400, 100);
            h.gateway.insert_record(offer.address, &offer.data).unwrap();
        }

        h.client
            .offer_loan(collection.data.mint, terms(), 2)
            .await
            .unwrap();

        let submitted = &h.gateway.submissions()[0];
        let expected: Vec<Pubkey> = [1u8, 3]
            .iter()
            .map(|&id| {
                h.client
                    .pda()
                    .loan_offer(&collection.address, &h.identity, id)
                    .unwrap()
                    .address
            })
            .collect();
        let touched: Vec<Pubkey> = submitted
            .iter()
            .flat_map(|ix| ix.accounts.iter().map(|meta| meta.pubkey))
            .filter(|key| expected.contains(key))
            .collect();
        assert_eq!(touched.len(), 2);
        assert_eq!(h.notifier.successes(), vec!["Loan offer(s) created".to_string()]);
    }

    #[tokio::test]
    async fn test_offer_loan_joins_cached_group() {
        let h = harness();
        let collection = fixtures::collection();
        h.gateway
            .insert_record(collection.address, &collection.data)
            .unwrap();
        let query = GroupedOfferQuery::all().with_collection(collection.address);
        assert!(h.client.grouped_loan_offers(query.clone()).await.unwrap().is_empty());

        h.client
            .offer_loan(collection.data.mint, terms(), 3)
            .await
            .unwrap();

        let groups = h.client.grouped_loan_offers(query).await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].count, 3);
        assert_eq!(groups[0].terms, terms());
    }

    #[tokio::test]
    async fn test_take_loan_moves_offer_into_active_loan() {
        let h = harness();
        h.gateway.set_block_time(Some(1_700_000_900));
        let collection = fixtures::collection();
        let lender = Pubkey::new_unique();
        let offer = fixtures::loan_offer(&collection, lender, 0, 1_000, 86_400, 900);
        let grouped = QueryGroup::GroupedLoanOffers(GroupedOfferQuery::all());
        h.client.reconciler().supersede(
            &grouped,
            crate::cache::QueryData::GroupedLoanOffers(crate::model::group_offers(&[offer.clone()])),
        );
        h.client.reconciler().supersede(
            &QueryGroup::Loans(LoanQuery::all()),
            crate::cache::QueryData::Loans(Vec::new()),
        );

        let mint = Pubkey::new_unique();
        h.metadata.insert(fixtures::metadata(mint, &collection));
        h.client.take_loan(&offer, mint).await.unwrap();

        assert!(h.client.grouped_loan_offers(GroupedOfferQuery::all()).await.unwrap().is_empty());
        let loans = h.client.loans(LoanQuery::all()).await.unwrap();
        assert_eq!(loans.len(), 1);
        assert_eq!(loans[0].data.lender, Some(lender));
        assert_eq!(loans[0].data.borrower, h.identity);
        assert_eq!(loans[0].data.start_date, Some(1_700_000_900));
        assert_eq!(loans[0].metadata.name, "Chicken #1");
    }

    #[tokio::test]
    async fn test_take_loan_rejects_foreign_collection() {
        let h = harness();
        let offer = fixtures::loan_offer(&fixtures::collection(), Pubkey::new_unique(), 0, 1, 60, 1);
        let mint = Pubkey::new_unique();
        h.metadata.insert(fixtures::metadata(mint, &fixtures::collection()));

        let result = h.client.take_loan(&offer, mint).await;

        assert!(matches!(result, Err(DexloanError::InvalidParameter { .. })));
        assert_eq!(h.gateway.submission_count(), 0);
    }

    #[tokio::test]
    async fn test_close_offer_requires_own_offer() {
        let h = harness();
        let collection = fixtures::collection();
        let foreign = fixtures::loan_offer(&collection, Pubkey::new_unique(), 0, 1, 60, 1);
        assert!(h.client.close_offer(&foreign).await.is_err());

        let own = fixtures::loan_offer(&collection, h.identity, 1, 1, 60, 1);
        h.client.close_offer(&own).await.unwrap();
        assert_eq!(h.gateway.submission_count(), 1);
        assert_eq!(h.notifier.successes(), vec!["Offer closed".to_string()]);
        assert_eq!(h.notifier.errors().len(), 1);
    }
}
