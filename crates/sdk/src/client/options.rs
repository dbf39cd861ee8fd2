//! Call option mutations

use anchor_lang::prelude::Pubkey;
use solana_sdk::signer::Signer;
use tracing::instrument;

use dexloan_types::{CallOptionData, CallOptionState, DexloanError, DexloanResult};

use super::DexloanClient;
use crate::{
    cache::{EntitySnapshot, MutationPlan, Patch},
    gateway::Confirmation,
    instructions::call_option::InitCallOptionArgs,
    model::{CallOption, Entity},
    pda::EntityKind,
};

/// Premium, strike and expiry of a call option listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallOptionTerms {
    pub amount: u64,
    pub strike_price: u64,
    pub expiry: i64,
}

impl DexloanClient {
    /// Sell a call option over an NFT
    #[instrument(skip(self))]
    pub async fn ask_call_option(
        &self,
        mint: Pubkey,
        collection_mint: Pubkey,
        terms: CallOptionTerms,
    ) -> DexloanResult<Confirmation> {
        let plan = self.plan_ask_call_option(mint, collection_mint, terms).await;
        self.settle(plan).await
    }

    async fn plan_ask_call_option(
        &self,
        mint: Pubkey,
        collection_mint: Pubkey,
        terms: CallOptionTerms,
    ) -> DexloanResult<MutationPlan> {
        let seller = self.identity()?.pubkey();
        if terms.amount == 0 {
            return Err(DexloanError::invalid_parameter("amount", "0", "a positive premium"));
        }
        if terms.expiry <= self.clock.now() {
            return Err(DexloanError::invalid_parameter(
                "expiry",
                &terms.expiry.to_string(),
                "a time in the future",
            ));
        }

        let collection = self.collection(&collection_mint).await?;
        let metadata = self.metadata.metadata_or_unknown(&mint).await?;
        let derived = self.pda.call_option(&mint, &seller)?;

        let listed = CallOption::new(
            derived.address,
            CallOptionData {
                state: CallOptionState::Listed,
                collection: collection.address,
                seller,
                buyer: None,
                amount: terms.amount,
                strike_price: terms.strike_price,
                expiry: terms.expiry,
                mint,
                bump: derived.bump,
            },
            metadata,
            collection.clone(),
        );

        let instruction = self.options.init_call_option(
            seller,
            mint,
            collection.address,
            InitCallOptionArgs {
                amount: terms.amount,
                strike_price: terms.strike_price,
                expiry: terms.expiry,
            },
        )?;

        Ok(
            MutationPlan::new("ask_call_option", "Call option created", vec![instruction])
                .with_speculative(Patch::Upsert(EntitySnapshot::CallOption(listed))),
        )
    }

    /// Pay the premium for a listed option
    #[instrument(skip(self, option), fields(option = %option.address))]
    pub async fn buy_call_option(&self, option: &CallOption) -> DexloanResult<Confirmation> {
        let plan = self.plan_buy_call_option(option);
        self.settle(plan).await
    }

    fn plan_buy_call_option(&self, option: &CallOption) -> DexloanResult<MutationPlan> {
        let buyer = self.identity()?.pubkey();
        let bought = option.bought(buyer, self.clock.now())?;
        let instruction =
            self.options
                .buy_call_option(buyer, option.data.seller, option.data.mint)?;

        Ok(
            MutationPlan::new("buy_call_option", "Call option bought", vec![instruction])
                .with_speculative(Patch::Upsert(EntitySnapshot::CallOption(bought))),
        )
    }

    /// Pay the strike and take the NFT
    #[instrument(skip(self, option), fields(option = %option.address))]
    pub async fn exercise_call_option(&self, option: &CallOption) -> DexloanResult<Confirmation> {
        let plan = self.plan_exercise_call_option(option);
        self.settle(plan).await
    }

    fn plan_exercise_call_option(&self, option: &CallOption) -> DexloanResult<MutationPlan> {
        let buyer = self.identity()?.pubkey();
        let exercised = option.exercised(&buyer, self.clock.now())?;
        let instructions =
            self.options
                .exercise_call_option(buyer, option.data.seller, option.data.mint)?;

        Ok(
            MutationPlan::new("exercise_call_option", "Option exercised", instructions)
                .with_speculative(Patch::merge(option, &exercised)),
        )
    }

    #[instrument(skip(self, option), fields(option = %option.address))]
    pub async fn close_call_option(&self, option: &CallOption) -> DexloanResult<Confirmation> {
        let plan = self.plan_close_call_option(option);
        self.settle(plan).await
    }

    fn plan_close_call_option(&self, option: &CallOption) -> DexloanResult<MutationPlan> {
        let seller = self.identity()?.pubkey();
        if !option.can_close(self.clock.now()) {
            return Err(DexloanError::invalid_state(
                CallOption::NAME,
                "Listed, Exercised or expired",
                &option.state().to_string(),
            ));
        }
        let instruction = self.options.close_call_option(seller, option.data.mint)?;

        Ok(
            MutationPlan::new("close_call_option", "Call option closed", vec![instruction])
                .with_speculative(Patch::Remove {
                    kind: EntityKind::CallOption,
                    address: option.address,
                }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CallOptionQuery, QueryData, QueryGroup};
    use crate::client::harness::harness;
    use crate::testing::fixtures;

    #[tokio::test]
    async fn test_ask_call_option_rejects_past_expiry() {
        let h = harness();
        let terms = CallOptionTerms {
            amount: 100,
            strike_price: 1_000,
            expiry: h.client.now() - 1,
        };

        let result = h
            .client
            .ask_call_option(Pubkey::new_unique(), Pubkey::new_unique(), terms)
            .await;

        assert!(matches!(result, Err(DexloanError::InvalidParameter { .. })));
        assert_eq!(h.gateway.submission_count(), 0);
    }

    #[tokio::test]
    async fn test_buy_then_exercise_updates_cached_lists() {
        let h = harness();
        let collection = fixtures::collection();
        let option = fixtures::listed_call_option_in(
            &collection,
            Pubkey::new_unique(),
            100,
            1_000,
            h.client.now() + 86_400,
        );
        let listed = QueryGroup::CallOptions(CallOptionQuery::all().with_state(CallOptionState::Listed));
        let bought = QueryGroup::CallOptions(CallOptionQuery::all().with_buyer(h.identity));
        h.client
            .reconciler()
            .supersede(&listed, QueryData::CallOptions(vec![option.clone()]));
        h.client
            .reconciler()
            .supersede(&bought, QueryData::CallOptions(Vec::new()));

        h.client.buy_call_option(&option).await.unwrap();

        assert!(h.client.call_options(CallOptionQuery::all().with_state(CallOptionState::Listed)).await.unwrap().is_empty());
        let mine = h.client.call_options(CallOptionQuery::all().with_buyer(h.identity)).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].state(), CallOptionState::Active);

        h.client.exercise_call_option(&mine[0]).await.unwrap();
        let mine = h.client.call_options(CallOptionQuery::all().with_buyer(h.identity)).await.unwrap();
        assert_eq!(mine[0].state(), CallOptionState::Exercised);
        assert_eq!(
            h.notifier.successes(),
            vec!["Call option bought".to_string(), "Option exercised".to_string()]
        );
    }

    #[tokio::test]
    async fn test_close_active_option_waits_for_expiry() {
        let h = harness();
        let expiry = h.client.now() + 60;
        let option = fixtures::listed_call_option(100, 1_000, expiry)
            .bought(Pubkey::new_unique(), h.client.now())
            .unwrap();

        assert!(matches!(
            h.client.close_call_option(&option).await,
            Err(DexloanError::InvalidState { .. })
        ));

        h.clock.advance(61);
        h.client.close_call_option(&option).await.unwrap();
        assert_eq!(h.gateway.submission_count(), 1);
    }
}
