//! Instruction builders for the listings program
//!
//! Each builder owns nothing but a shared [`PdaBuilder`]; it derives every
//! program account it needs and returns plain [`Instruction`]s, ready for
//! [`LedgerGateway::submit_mutation`](crate::gateway::LedgerGateway::submit_mutation).

pub mod builder;
pub mod call_option;
pub mod hire;
pub mod loan;
pub mod offer;

pub use builder::*;
pub use call_option::*;
pub use hire::*;
pub use loan::*;
pub use offer::*;

use anchor_lang::prelude::Pubkey;
use solana_sdk::instruction::Instruction;
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account_idempotent,
};

/// Associated token account of `wallet` for `mint`
pub fn token_account(wallet: &Pubkey, mint: &Pubkey) -> Pubkey {
    get_associated_token_address(wallet, mint)
}

/// Create the associated token account if it is missing
///
/// Receivers of an NFT (lender on repossession, buyer on exercise, hirer)
/// may not hold an account for the mint yet.
pub fn ensure_token_account(payer: &Pubkey, wallet: &Pubkey, mint: &Pubkey) -> Instruction {
    create_associated_token_account_idempotent(payer, wallet, mint, &spl_token::ID)
}
