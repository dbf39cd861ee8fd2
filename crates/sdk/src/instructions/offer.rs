use anchor_lang::prelude::*;
use solana_sdk::{instruction::Instruction, system_program, sysvar};
use std::sync::Arc;

use dexloan_types::{DexloanResult, METADATA_PROGRAM_ID};

use super::{token_account, DexloanInstructionBuilder, InstructionBuilder};
use crate::{impl_instruction, pda::PdaBuilder};

// Instruction discriminators
const OFFER_LOAN_DISCRIMINATOR: [u8; 8] = [44, 12, 76, 144, 210, 208, 239, 85];
const TAKE_LOAN_DISCRIMINATOR: [u8; 8] = [153, 53, 51, 59, 222, 102, 52, 131];
const CLOSE_OFFER_DISCRIMINATOR: [u8; 8] = [191, 72, 67, 35, 239, 209, 97, 132];

/// Arguments for opening one loan offer slot
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq)]
pub struct OfferLoanArgs {
    pub amount: u64,
    pub basis_points: u32,
    pub duration: i64,
    pub id: u8,
}

impl_instruction!(OfferLoanArgs, OFFER_LOAN_DISCRIMINATOR);

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq)]
pub struct TakeLoanArgs {
    pub id: u8,
}

impl_instruction!(TakeLoanArgs, TAKE_LOAN_DISCRIMINATOR);

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq)]
pub struct CloseOfferArgs {
    pub id: u8,
}

impl_instruction!(CloseOfferArgs, CLOSE_OFFER_DISCRIMINATOR);

/// Loan offer instruction builder
pub struct OfferInstructionBuilder {
    pda: Arc<PdaBuilder>,
}

impl OfferInstructionBuilder {
    pub fn new(pda: Arc<PdaBuilder>) -> Self {
        Self { pda }
    }

    /// Build one offer instruction per id, all with the same terms
    pub fn offer_loan(
        &self,
        lender: Pubkey,
        collection: Pubkey,
        amount: u64,
        basis_points: u32,
        duration: i64,
        ids: &[u8],
    ) -> DexloanResult<Vec<Instruction>> {
        ids.iter()
            .map(|&id| -> DexloanResult<Instruction> {
                let offer = self.pda.loan_offer(&collection, &lender, id)?;
                let args = OfferLoanArgs {
                    amount,
                    basis_points,
                    duration,
                    id,
                };

                Ok(DexloanInstructionBuilder::new()
                    .add_signer(lender)
                    .add_writable(offer.address)
                    .add_readonly(collection)
                    .add_readonly(system_program::ID)
                    .add_readonly(sysvar::rent::ID)
                    .with_data(args.build_data()?)
                    .build(self.pda.program_id()))
            })
            .collect()
    }

    /// Build take loan instruction: the borrower accepts an offer against their NFT
    pub fn take_loan(
        &self,
        borrower: Pubkey,
        lender: Pubkey,
        collection: Pubkey,
        mint: Pubkey,
        id: u8,
    ) -> DexloanResult<Instruction> {
        let offer = self.pda.loan_offer(&collection, &lender, id)?;
        let loan = self.pda.loan(&mint, &borrower)?;
        let metadata = self.pda.metadata(&mint)?;
        let edition = self.pda.edition(&mint)?;

        Ok(DexloanInstructionBuilder::new()
            .add_writable(lender)
            .add_signer(borrower)
            .add_writable(offer.address)
            .add_writable(loan.address)
            .add_readonly(collection)
            .add_writable(token_account(&borrower, &mint))
            .add_readonly(mint)
            .add_readonly(metadata.address)
            .add_readonly(edition.address)
            .add_readonly(METADATA_PROGRAM_ID)
            .add_readonly(system_program::ID)
            .add_readonly(spl_token::ID)
            .add_readonly(sysvar::clock::ID)
            .add_readonly(sysvar::rent::ID)
            .with_data(TakeLoanArgs { id }.build_data()?)
            .build(self.pda.program_id()))
    }

    /// Build close offer instruction, refunding the lender
    pub fn close_offer(&self, lender: Pubkey, collection: Pubkey, id: u8) -> DexloanResult<Instruction> {
        let offer = self.pda.loan_offer(&collection, &lender, id)?;

        Ok(DexloanInstructionBuilder::new()
            .add_signer(lender)
            .add_writable(offer.address)
            .add_readonly(collection)
            .add_readonly(system_program::ID)
            .with_data(CloseOfferArgs { id }.build_data()?)
            .build(self.pda.program_id()))
    }
}
