//! NFT rental mutations

use anchor_lang::prelude::Pubkey;
use solana_sdk::signer::Signer;
use tracing::instrument;

use dexloan_types::{DexloanError, DexloanResult, HireData, HireState};

use super::DexloanClient;
use crate::{
    cache::{EntitySnapshot, MutationPlan, Patch},
    gateway::Confirmation,
    instructions::hire::InitHireArgs,
    model::{Entity, Hire},
    pda::EntityKind,
};

/// Daily price, listing expiry and an optional reserved borrower
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HireTerms {
    pub amount: u64,
    pub expiry: i64,
    pub borrower: Option<Pubkey>,
}

impl DexloanClient {
    /// List an NFT for hire
    #[instrument(skip(self))]
    pub async fn ask_hire(
        &self,
        mint: Pubkey,
        collection_mint: Pubkey,
        terms: HireTerms,
    ) -> DexloanResult<Confirmation> {
        let plan = self.plan_ask_hire(mint, collection_mint, terms).await;
        self.settle(plan).await
    }

    async fn plan_ask_hire(
        &self,
        mint: Pubkey,
        collection_mint: Pubkey,
        terms: HireTerms,
    ) -> DexloanResult<MutationPlan> {
        let lender = self.identity()?.pubkey();
        if terms.expiry <= self.clock.now() {
            return Err(DexloanError::invalid_parameter(
                "expiry",
                &terms.expiry.to_string(),
                "a time in the future",
            ));
        }

        let collection = self.collection(&collection_mint).await?;
        let metadata = self.metadata.metadata_or_unknown(&mint).await?;
        let derived = self.pda.hire(&mint, &lender)?;

        let listed = Hire::new(
            derived.address,
            HireData {
                state: HireState::Listed,
                collection: collection.address,
                lender,
                borrower: terms.borrower,
                amount: terms.amount,
                expiry: terms.expiry,
                current_start: None,
                current_expiry: None,
                escrow_balance: 0,
                mint,
                bump: derived.bump,
            },
            metadata,
            collection.clone(),
        );

        let instruction = self.hires.init_hire(
            lender,
            mint,
            collection.address,
            InitHireArgs {
                amount: terms.amount,
                expiry: terms.expiry,
                borrower: terms.borrower,
            },
        )?;

        Ok(MutationPlan::new("ask_hire", "Listed for hire", vec![instruction])
            .with_speculative(Patch::Upsert(EntitySnapshot::Hire(listed))))
    }

    /// Rent for `days`; the period starts at the confirming block's time
    #[instrument(skip(self, hire), fields(hire = %hire.address))]
    pub async fn take_hire(&self, hire: &Hire, days: u16) -> DexloanResult<Confirmation> {
        let plan = self.plan_take_hire(hire, days);
        self.settle(plan).await
    }

    fn plan_take_hire(&self, hire: &Hire, days: u16) -> DexloanResult<MutationPlan> {
        let borrower = self.identity()?.pubkey();
        hire.taken(borrower, u64::from(days), self.clock.now())?;

        let instructions =
            self.hires
                .take_hire(borrower, hire.data.lender, hire.data.mint, days)?;
        let hire = hire.clone();

        Ok(
            MutationPlan::new("take_hire", "NFT hired", instructions).with_on_confirm(
                move |ledger_time| match hire.taken(borrower, u64::from(days), ledger_time) {
                    Ok(taken) => vec![Patch::Upsert(EntitySnapshot::Hire(taken))],
                    Err(_) => Vec::new(),
                },
            ),
        )
    }

    /// Take back a hire whose period lapsed
    #[instrument(skip(self, hire), fields(hire = %hire.address))]
    pub async fn recover_hire(&self, hire: &Hire) -> DexloanResult<Confirmation> {
        let plan = self.plan_recover_hire(hire);
        self.settle(plan).await
    }

    fn plan_recover_hire(&self, hire: &Hire) -> DexloanResult<MutationPlan> {
        let lender = self.identity()?.pubkey();
        let recovered = hire.recovered(self.clock.now())?;
        let borrower = hire
            .data
            .borrower
            .ok_or_else(|| DexloanError::invalid_state(Hire::NAME, "hired", "no borrower"))?;
        let instruction = self.hires.recover_hire(lender, borrower, hire.data.mint)?;

        Ok(MutationPlan::new("recover_hire", "NFT recovered", vec![instruction])
            .with_speculative(Patch::merge(hire, &recovered)))
    }

    #[instrument(skip(self, hire), fields(hire = %hire.address))]
    pub async fn close_hire(&self, hire: &Hire) -> DexloanResult<Confirmation> {
        let plan = self.plan_close_hire(hire);
        self.settle(plan).await
    }

    fn plan_close_hire(&self, hire: &Hire) -> DexloanResult<MutationPlan> {
        let lender = self.identity()?.pubkey();
        if !hire.can_close(self.clock.now()) {
            return Err(DexloanError::invalid_state(Hire::NAME, "Listed or Lapsed", "Active"));
        }
        let instruction = self.hires.close_hire(lender, hire.data.mint)?;

        Ok(MutationPlan::new("close_hire", "Hire closed", vec![instruction])
            .with_speculative(Patch::Remove {
                kind: EntityKind::Hire,
                address: hire.address,
            }))
    }
}
