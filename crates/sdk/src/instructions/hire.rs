use anchor_lang::prelude::*;
use solana_sdk::{instruction::Instruction, system_program, sysvar};
use std::sync::Arc;

use dexloan_types::{DexloanResult, METADATA_PROGRAM_ID};

use super::{ensure_token_account, token_account, DexloanInstructionBuilder, InstructionBuilder};
use crate::{impl_instruction, pda::PdaBuilder};

// Instruction discriminators
const INIT_HIRE_DISCRIMINATOR: [u8; 8] = [190, 217, 232, 114, 148, 236, 170, 99];
const TAKE_HIRE_DISCRIMINATOR: [u8; 8] = [150, 189, 12, 155, 46, 37, 53, 183];
const RECOVER_HIRE_DISCRIMINATOR: [u8; 8] = [247, 183, 111, 223, 79, 76, 123, 142];
const CLOSE_HIRE_DISCRIMINATOR: [u8; 8] = [23, 238, 214, 107, 39, 124, 90, 109];

/// Arguments for listing an NFT for hire
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq)]
pub struct InitHireArgs {
    /// Daily cost in lamports
    pub amount: u64,
    pub expiry: i64,
    /// Reserve the hire for one wallet
    pub borrower: Option<Pubkey>,
}

impl_instruction!(InitHireArgs, INIT_HIRE_DISCRIMINATOR);

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq)]
pub struct TakeHireArgs {
    pub days: u16,
}

impl_instruction!(TakeHireArgs, TAKE_HIRE_DISCRIMINATOR);

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Default)]
pub struct RecoverHireArgs {}

impl_instruction!(RecoverHireArgs, RECOVER_HIRE_DISCRIMINATOR);

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Default)]
pub struct CloseHireArgs {}

impl_instruction!(CloseHireArgs, CLOSE_HIRE_DISCRIMINATOR);

/// Hire instruction builder
pub struct HireInstructionBuilder {
    pda: Arc<PdaBuilder>,
}

impl HireInstructionBuilder {
    pub fn new(pda: Arc<PdaBuilder>) -> Self {
        Self { pda }
    }

    pub fn init_hire(
        &self,
        lender: Pubkey,
        mint: Pubkey,
        collection: Pubkey,
        args: InitHireArgs,
    ) -> DexloanResult<Instruction> {
        let hire = self.pda.hire(&mint, &lender)?;
        let edition = self.pda.edition(&mint)?;

        Ok(DexloanInstructionBuilder::new()
            .add_signer(lender)
            .add_writable(token_account(&lender, &mint))
            .add_writable(hire.address)
            .add_readonly(collection)
            .add_readonly(mint)
            .add_readonly(edition.address)
            .add_readonly(METADATA_PROGRAM_ID)
            .add_readonly(system_program::ID)
            .add_readonly(spl_token::ID)
            .add_readonly(sysvar::clock::ID)
            .add_readonly(sysvar::rent::ID)
            .with_data(args.build_data()?)
            .build(self.pda.program_id()))
    }

    /// Build take hire instructions: hirer token account, then the hire
    pub fn take_hire(
        &self,
        borrower: Pubkey,
        lender: Pubkey,
        mint: Pubkey,
        days: u16,
    ) -> DexloanResult<Vec<Instruction>> {
        let hire = self.pda.hire(&mint, &lender)?;
        let escrow = self.pda.hire_escrow(&mint, &lender)?;
        let metadata = self.pda.metadata(&mint)?;
        let edition = self.pda.edition(&mint)?;

        let take = DexloanInstructionBuilder::new()
            .add_writable(lender)
            .add_signer(borrower)
            .add_writable(hire.address)
            .add_writable(escrow.address)
            .add_writable(token_account(&lender, &mint))
            .add_writable(token_account(&borrower, &mint))
            .add_readonly(mint)
            .add_readonly(edition.address)
            .add_readonly(metadata.address)
            .add_readonly(METADATA_PROGRAM_ID)
            .add_readonly(system_program::ID)
            .add_readonly(spl_token::ID)
            .add_readonly(sysvar::clock::ID)
            .add_readonly(sysvar::rent::ID)
            .with_data(TakeHireArgs { days }.build_data()?)
            .build(self.pda.program_id());

        Ok(vec![ensure_token_account(&borrower, &borrower, &mint), take])
    }

    /// Build recover instruction, returning a lapsed hire to the lender
    pub fn recover_hire(&self, lender: Pubkey, borrower: Pubkey, mint: Pubkey) -> DexloanResult<Instruction> {
        let hire = self.pda.hire(&mint, &lender)?;
        let escrow = self.pda.hire_escrow(&mint, &lender)?;
        let edition = self.pda.edition(&mint)?;

        Ok(DexloanInstructionBuilder::new()
            .add_signer(lender)
            .add_writable(borrower)
            .add_writable(hire.address)
            .add_writable(escrow.address)
            .add_writable(token_account(&lender, &mint))
            .add_writable(token_account(&borrower, &mint))
            .add_readonly(mint)
            .add_readonly(edition.address)
            .add_readonly(METADATA_PROGRAM_ID)
            .add_readonly(system_program::ID)
            .add_readonly(spl_token::ID)
            .add_readonly(sysvar::clock::ID)
            .with_data(RecoverHireArgs {}.build_data()?)
            .build(self.pda.program_id()))
    }

    pub fn close_hire(&self, lender: Pubkey, mint: Pubkey) -> DexloanResult<Instruction> {
        let hire = self.pda.hire(&mint, &lender)?;
        let escrow = self.pda.hire_escrow(&mint, &lender)?;
        let edition = self.pda.edition(&mint)?;

        Ok(DexloanInstructionBuilder::new()
            .add_signer(lender)
            .add_writable(hire.address)
            .add_writable(escrow.address)
            .add_writable(token_account(&lender, &mint))
            .add_readonly(mint)
            .add_readonly(edition.address)
            .add_readonly(METADATA_PROGRAM_ID)
            .add_readonly(system_program::ID)
            .add_readonly(spl_token::ID)
            .add_readonly(sysvar::clock::ID)
            .with_data(CloseHireArgs {}.build_data()?)
            .build(self.pda.program_id()))
    }
}
