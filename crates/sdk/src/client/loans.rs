//! Loan listing mutations

use anchor_lang::prelude::Pubkey;
use solana_sdk::signer::Signer;
use tracing::instrument;

use dexloan_types::{DexloanError, DexloanResult, LoanData, LoanState};

use super::DexloanClient;
use crate::{
    cache::{EntitySnapshot, MutationPlan, Patch},
    gateway::Confirmation,
    instructions::loan::InitLoanArgs,
    model::{Entity, Loan, OfferTerms},
};

pub(super) fn validate_terms(terms: &OfferTerms) -> DexloanResult<()> {
    if terms.amount == 0 {
        return Err(DexloanError::invalid_parameter("amount", "0", "a positive amount"));
    }
    if terms.duration <= 0 {
        return Err(DexloanError::invalid_parameter(
            "duration",
            &terms.duration.to_string(),
            "a positive number of seconds",
        ));
    }
    Ok(())
}

impl DexloanClient {
    /// List an NFT as collateral for a loan request
    #[instrument(skip(self))]
    pub async fn ask_loan(
        &self,
        mint: Pubkey,
        collection_mint: Pubkey,
        terms: OfferTerms,
    ) -> DexloanResult<Confirmation> {
        let plan = self.plan_ask_loan(mint, collection_mint, terms).await;
        self.settle(plan).await
    }

    async fn plan_ask_loan(
        &self,
        mint: Pubkey,
        collection_mint: Pubkey,
        terms: OfferTerms,
    ) -> DexloanResult<MutationPlan> {
        let borrower = self.identity()?.pubkey();
        validate_terms(&terms)?;

        let collection = self.collection(&collection_mint).await?;
        let metadata = self.metadata.metadata_or_unknown(&mint).await?;
        let derived = self.pda.loan(&mint, &borrower)?;

        let listed = Loan::new(
            derived.address,
            LoanData {
                state: LoanState::Listed,
                collection: collection.address,
                borrower,
                lender: None,
                amount: terms.amount,
                outstanding: terms.amount,
                basis_points: terms.basis_points,
                duration: terms.duration,
                start_date: None,
                mint,
                bump: derived.bump,
            },
            metadata,
            collection.clone(),
        );

        let instruction = self.loans.init_loan(
            borrower,
            mint,
            collection.address,
            InitLoanArgs {
                amount: terms.amount,
                basis_points: terms.basis_points,
                duration: terms.duration,
            },
        )?;

        Ok(MutationPlan::new("ask_loan", "Listing created", vec![instruction])
            .with_speculative(Patch::Upsert(EntitySnapshot::Loan(listed))))
    }

    /// Fund a listed loan; the loan starts at the confirming block's time
    #[instrument(skip(self, loan), fields(loan = %loan.address))]
    pub async fn give_loan(&self, loan: &Loan) -> DexloanResult<Confirmation> {
        let plan = self.plan_give_loan(loan);
        self.settle(plan).await
    }

    fn plan_give_loan(&self, loan: &Loan) -> DexloanResult<MutationPlan> {
        let lender = self.identity()?.pubkey();
        loan.activate(lender, self.clock.now())?;

        let instruction = self
            .loans
            .give_loan(lender, loan.data.borrower, loan.data.mint)?;
        let loan = loan.clone();

        Ok(
            MutationPlan::new("give_loan", "Loan given", vec![instruction]).with_on_confirm(
                move |ledger_time| match loan.activate(lender, ledger_time) {
                    Ok(active) => vec![Patch::Upsert(EntitySnapshot::Loan(active))],
                    Err(_) => Vec::new(),
                },
            ),
        )
    }

    /// Withdraw a listing that nobody funded
    #[instrument(skip(self, loan), fields(loan = %loan.address))]
    pub async fn close_loan(&self, loan: &Loan) -> DexloanResult<Confirmation> {
        let plan = self.plan_close_loan(loan);
        self.settle(plan).await
    }

    fn plan_close_loan(&self, loan: &Loan) -> DexloanResult<MutationPlan> {
        let borrower = self.identity()?.pubkey();
        let cancelled = loan.cancelled()?;
        let instruction = self.loans.close_loan(borrower, loan.data.mint)?;

        Ok(MutationPlan::new("close_loan", "Loan closed", vec![instruction])
            .with_speculative(Patch::merge(loan, &cancelled)))
    }

    #[instrument(skip(self, loan), fields(loan = %loan.address))]
    pub async fn repay_loan(&self, loan: &Loan) -> DexloanResult<Confirmation> {
        let plan = self.plan_repay_loan(loan);
        self.settle(plan).await
    }

    fn plan_repay_loan(&self, loan: &Loan) -> DexloanResult<MutationPlan> {
        let borrower = self.identity()?.pubkey();
        let repaid = loan.repaid()?;
        let lender = loan
            .data
            .lender
            .ok_or_else(|| DexloanError::invalid_state(Loan::NAME, "funded", "no lender"))?;
        let instruction = self.loans.repay_loan(borrower, lender, loan.data.mint)?;

        Ok(MutationPlan::new(
            "repay_loan",
            "Loan repaid. Your NFT has been unlocked.",
            vec![instruction],
        )
        .with_speculative(Patch::merge(loan, &repaid)))
    }

    /// Take the collateral of an overdue loan
    #[instrument(skip(self, loan), fields(loan = %loan.address))]
    pub async fn repossess(&self, loan: &Loan) -> DexloanResult<Confirmation> {
        let plan = self.plan_repossess(loan);
        self.settle(plan).await
    }

    fn plan_repossess(&self, loan: &Loan) -> DexloanResult<MutationPlan> {
        let lender = self.identity()?.pubkey();
        let defaulted = loan.defaulted(self.clock.now())?;
        let instructions = self
            .loans
            .repossess_collateral(lender, loan.data.borrower, loan.data.mint)?;

        Ok(MutationPlan::new("repossess", "NFT repossessed.", instructions)
            .with_speculative(Patch::merge(loan, &defaulted)))
    }
}
