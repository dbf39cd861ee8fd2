use anchor_lang::prelude::*;
use solana_sdk::{instruction::Instruction, system_program, sysvar};
use std::sync::Arc;

use dexloan_types::{DexloanResult, METADATA_PROGRAM_ID};

use super::{ensure_token_account, token_account, DexloanInstructionBuilder, InstructionBuilder};
use crate::{impl_instruction, pda::PdaBuilder};

// Instruction discriminators
const INIT_LOAN_DISCRIMINATOR: [u8; 8] = [51, 21, 242, 242, 75, 22, 74, 229];
const GIVE_LOAN_DISCRIMINATOR: [u8; 8] = [214, 13, 234, 247, 218, 48, 209, 57];
const CLOSE_LOAN_DISCRIMINATOR: [u8; 8] = [96, 114, 111, 204, 149, 228, 235, 124];
const REPAY_LOAN_DISCRIMINATOR: [u8; 8] = [224, 93, 144, 77, 61, 17, 137, 54];
const REPOSSESS_COLLATERAL_DISCRIMINATOR: [u8; 8] = [15, 8, 30, 45, 144, 236, 29, 15];

/// Arguments for listing an NFT as loan collateral
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq)]
pub struct InitLoanArgs {
    pub amount: u64,
    pub basis_points: u32,
    pub duration: i64,
}

impl_instruction!(InitLoanArgs, INIT_LOAN_DISCRIMINATOR);

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Default)]
pub struct GiveLoanArgs {}

impl_instruction!(GiveLoanArgs, GIVE_LOAN_DISCRIMINATOR);

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Default)]
pub struct CloseLoanArgs {}

impl_instruction!(CloseLoanArgs, CLOSE_LOAN_DISCRIMINATOR);

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Default)]
pub struct RepayLoanArgs {}

impl_instruction!(RepayLoanArgs, REPAY_LOAN_DISCRIMINATOR);

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Default)]
pub struct RepossessCollateralArgs {}

impl_instruction!(RepossessCollateralArgs, REPOSSESS_COLLATERAL_DISCRIMINATOR);

/// Loan instruction builder
pub struct LoanInstructionBuilder {
    pda: Arc<PdaBuilder>,
}

impl LoanInstructionBuilder {
    pub fn new(pda: Arc<PdaBuilder>) -> Self {
        Self { pda }
    }

    /// Build init loan instruction, escrowing the NFT under the loan account
    pub fn init_loan(
        &self,
        borrower: Pubkey,
        mint: Pubkey,
        collection: Pubkey,
        args: InitLoanArgs,
    ) -> DexloanResult<Instruction> {
        let loan = self.pda.loan(&mint, &borrower)?;
        let edition = self.pda.edition(&mint)?;

        Ok(DexloanInstructionBuilder::new()
            .add_signer(borrower)
            .add_writable(token_account(&borrower, &mint))
            .add_writable(loan.address)
            .add_readonly(collection)
            .add_readonly(mint)
            .add_readonly(edition.address)
            .add_readonly(METADATA_PROGRAM_ID)
            .add_readonly(system_program::ID)
            .add_readonly(spl_token::ID)
            .add_readonly(sysvar::rent::ID)
            .with_data(args.build_data()?)
            .build(self.pda.program_id()))
    }

    /// Build give loan instruction, funding a listed loan
    pub fn give_loan(&self, lender: Pubkey, borrower: Pubkey, mint: Pubkey) -> DexloanResult<Instruction> {
        let loan = self.pda.loan(&mint, &borrower)?;

        Ok(DexloanInstructionBuilder::new()
            .add_writable(borrower)
            .add_signer(lender)
            .add_writable(loan.address)
            .add_readonly(mint)
            .add_readonly(system_program::ID)
            .add_readonly(spl_token::ID)
            .add_readonly(sysvar::clock::ID)
            .with_data(GiveLoanArgs {}.build_data()?)
            .build(self.pda.program_id()))
    }

    /// Build close loan instruction, returning the NFT of an unfunded listing
    pub fn close_loan(&self, borrower: Pubkey, mint: Pubkey) -> DexloanResult<Instruction> {
        let loan = self.pda.loan(&mint, &borrower)?;
        let edition = self.pda.edition(&mint)?;

        Ok(DexloanInstructionBuilder::new()
            .add_signer(borrower)
            .add_writable(token_account(&borrower, &mint))
            .add_writable(loan.address)
            .add_readonly(mint)
            .add_readonly(edition.address)
            .add_readonly(METADATA_PROGRAM_ID)
            .add_readonly(system_program::ID)
            .add_readonly(spl_token::ID)
            .with_data(CloseLoanArgs {}.build_data()?)
            .build(self.pda.program_id()))
    }

    /// Build repay loan instruction
    pub fn repay_loan(&self, borrower: Pubkey, lender: Pubkey, mint: Pubkey) -> DexloanResult<Instruction> {
        let loan = self.pda.loan(&mint, &borrower)?;
        let edition = self.pda.edition(&mint)?;

        Ok(DexloanInstructionBuilder::new()
            .add_signer(borrower)
            .add_writable(token_account(&borrower, &mint))
            .add_writable(lender)
            .add_writable(loan.address)
            .add_readonly(mint)
            .add_readonly(edition.address)
            .add_readonly(METADATA_PROGRAM_ID)
            .add_readonly(system_program::ID)
            .add_readonly(spl_token::ID)
            .add_readonly(sysvar::clock::ID)
            .with_data(RepayLoanArgs {}.build_data()?)
            .build(self.pda.program_id()))
    }

    /// Build repossess instructions: lender token account, then the claim
    pub fn repossess_collateral(
        &self,
        lender: Pubkey,
        borrower: Pubkey,
        mint: Pubkey,
    ) -> DexloanResult<Vec<Instruction>> {
        let loan = self.pda.loan(&mint, &borrower)?;
        let edition = self.pda.edition(&mint)?;

        let repossess = DexloanInstructionBuilder::new()
            .add_signer(lender)
            .add_writable(borrower)
            .add_writable(token_account(&lender, &mint))
            .add_writable(token_account(&borrower, &mint))
            .add_writable(loan.address)
            .add_readonly(mint)
            .add_readonly(edition.address)
            .add_readonly(METADATA_PROGRAM_ID)
            .add_readonly(system_program::ID)
            .add_readonly(spl_token::ID)
            .add_readonly(sysvar::clock::ID)
            .add_readonly(sysvar::rent::ID)
            .with_data(RepossessCollateralArgs {}.build_data()?)
            .build(self.pda.program_id());

        Ok(vec![ensure_token_account(&lender, &lender, &mint), repossess])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dexloan_types::PROGRAM_ID;

    fn builder() -> LoanInstructionBuilder {
        LoanInstructionBuilder::new(Arc::new(PdaBuilder::new(PROGRAM_ID)))
    }

    #[test]
    fn test_init_loan_layout() {
        let borrower = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let collection = Pubkey::new_unique();
        let ix = builder()
            .init_loan(
                borrower,
                mint,
                collection,
                InitLoanArgs {
                    amount: 1_000,
                    basis_points: 500,
                    duration: 86_400,
                },
            )
            .unwrap();

        assert_eq!(ix.program_id, PROGRAM_ID);
        assert_eq!(&ix.data[..8], &INIT_LOAN_DISCRIMINATOR);
        assert_eq!(ix.data.len(), 8 + 8 + 4 + 8);
        assert_eq!(&ix.data[8..16], &1_000u64.to_le_bytes());

        assert!(ix.accounts[0].is_signer && ix.accounts[0].is_writable);
        assert_eq!(ix.accounts[0].pubkey, borrower);
        let loan = PdaBuilder::new(PROGRAM_ID).loan(&mint, &borrower).unwrap();
        assert_eq!(ix.accounts[2].pubkey, loan.address);
        assert_eq!(ix.accounts[1].pubkey, token_account(&borrower, &mint));
    }

    #[test]
    fn test_give_loan_only_lender_signs() {
        let lender = Pubkey::new_unique();
        let ix = builder()
            .give_loan(lender, Pubkey::new_unique(), Pubkey::new_unique())
            .unwrap();

        let signers: Vec<_> = ix.accounts.iter().filter(|a| a.is_signer).collect();
        assert_eq!(signers.len(), 1);
        assert_eq!(signers[0].pubkey, lender);
        assert_eq!(ix.data, GIVE_LOAN_DISCRIMINATOR.to_vec());
    }

    #[test]
    fn test_repossess_creates_lender_token_account_first() {
        let lender = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let ixs = builder()
            .repossess_collateral(lender, Pubkey::new_unique(), mint)
            .unwrap();

        assert_eq!(ixs.len(), 2);
        assert_eq!(ixs[0].program_id, spl_associated_token_account::ID);
        assert_eq!(ixs[1].accounts[2].pubkey, token_account(&lender, &mint));
    }
}
