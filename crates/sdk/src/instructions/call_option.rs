use anchor_lang::prelude::*;
use solana_sdk::{instruction::Instruction, system_program, sysvar};
use std::sync::Arc;

use dexloan_types::{DexloanResult, METADATA_PROGRAM_ID};

use super::{ensure_token_account, token_account, DexloanInstructionBuilder, InstructionBuilder};
use crate::{impl_instruction, pda::PdaBuilder};

// Instruction discriminators
const INIT_CALL_OPTION_DISCRIMINATOR: [u8; 8] = [77, 231, 121, 172, 97, 93, 157, 133];
const BUY_CALL_OPTION_DISCRIMINATOR: [u8; 8] = [252, 196, 231, 103, 101, 140, 169, 253];
const EXERCISE_CALL_OPTION_DISCRIMINATOR: [u8; 8] = [186, 113, 140, 68, 13, 183, 254, 75];
const CLOSE_CALL_OPTION_DISCRIMINATOR: [u8; 8] = [229, 102, 122, 39, 251, 250, 218, 216];

/// Arguments for writing a call option against an NFT
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq)]
pub struct InitCallOptionArgs {
    /// Premium in lamports
    pub amount: u64,
    pub strike_price: u64,
    pub expiry: i64,
}

impl_instruction!(InitCallOptionArgs, INIT_CALL_OPTION_DISCRIMINATOR);

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Default)]
pub struct BuyCallOptionArgs {}

impl_instruction!(BuyCallOptionArgs, BUY_CALL_OPTION_DISCRIMINATOR);

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Default)]
pub struct ExerciseCallOptionArgs {}

impl_instruction!(ExerciseCallOptionArgs, EXERCISE_CALL_OPTION_DISCRIMINATOR);

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Default)]
pub struct CloseCallOptionArgs {}

impl_instruction!(CloseCallOptionArgs, CLOSE_CALL_OPTION_DISCRIMINATOR);

/// Call option instruction builder
pub struct CallOptionInstructionBuilder {
    pda: Arc<PdaBuilder>,
}

impl CallOptionInstructionBuilder {
    pub fn new(pda: Arc<PdaBuilder>) -> Self {
        Self { pda }
    }

    pub fn init_call_option(
        &self,
        seller: Pubkey,
        mint: Pubkey,
        collection: Pubkey,
        args: InitCallOptionArgs,
    ) -> DexloanResult<Instruction> {
        let call_option = self.pda.call_option(&mint, &seller)?;
        let edition = self.pda.edition(&mint)?;

        Ok(DexloanInstructionBuilder::new()
            .add_signer(seller)
            .add_writable(token_account(&seller, &mint))
            .add_writable(call_option.address)
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

    /// Build buy instruction; the premium moves from buyer to seller
    pub fn buy_call_option(&self, buyer: Pubkey, seller: Pubkey, mint: Pubkey) -> DexloanResult<Instruction> {
        let call_option = self.pda.call_option(&mint, &seller)?;
        let metadata = self.pda.metadata(&mint)?;
        let edition = self.pda.edition(&mint)?;

        Ok(DexloanInstructionBuilder::new()
            .add_writable(seller)
            .add_signer(buyer)
            .add_writable(call_option.address)
            .add_writable(token_account(&seller, &mint))
            .add_readonly(mint)
            .add_readonly(metadata.address)
            .add_readonly(edition.address)
            .add_readonly(METADATA_PROGRAM_ID)
            .add_readonly(system_program::ID)
            .add_readonly(spl_token::ID)
            .add_readonly(sysvar::clock::ID)
            .with_data(BuyCallOptionArgs {}.build_data()?)
            .build(self.pda.program_id()))
    }

    /// Build exercise instructions: buyer token account, then the exercise
    pub fn exercise_call_option(
        &self,
        buyer: Pubkey,
        seller: Pubkey,
        mint: Pubkey,
    ) -> DexloanResult<Vec<Instruction>> {
        let call_option = self.pda.call_option(&mint, &seller)?;
        let metadata = self.pda.metadata(&mint)?;
        let edition = self.pda.edition(&mint)?;

        let exercise = DexloanInstructionBuilder::new()
            .add_writable(seller)
            .add_signer(buyer)
            .add_writable(call_option.address)
            .add_writable(token_account(&buyer, &mint))
            .add_writable(token_account(&seller, &mint))
            .add_readonly(mint)
            .add_readonly(edition.address)
            .add_readonly(metadata.address)
            .add_readonly(METADATA_PROGRAM_ID)
            .add_readonly(system_program::ID)
            .add_readonly(spl_token::ID)
            .add_readonly(sysvar::clock::ID)
            .add_readonly(sysvar::rent::ID)
            .with_data(ExerciseCallOptionArgs {}.build_data()?)
            .build(self.pda.program_id());

        Ok(vec![ensure_token_account(&buyer, &buyer, &mint), exercise])
    }

    pub fn close_call_option(&self, seller: Pubkey, mint: Pubkey) -> DexloanResult<Instruction> {
        let call_option = self.pda.call_option(&mint, &seller)?;
        let edition = self.pda.edition(&mint)?;

        Ok(DexloanInstructionBuilder::new()
            .add_signer(seller)
            .add_writable(call_option.address)
            .add_writable(token_account(&seller, &mint))
            .add_readonly(mint)
            .add_readonly(edition.address)
            .add_readonly(METADATA_PROGRAM_ID)
            .add_readonly(system_program::ID)
            .add_readonly(spl_token::ID)
            .add_readonly(sysvar::clock::ID)
            .with_data(CloseCallOptionArgs {}.build_data()?)
            .build(self.pda.program_id()))
    }
}
