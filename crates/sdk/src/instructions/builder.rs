use anchor_lang::prelude::{AnchorSerialize, Pubkey};
use solana_sdk::instruction::{AccountMeta, Instruction};

use dexloan_types::{DexloanError, DexloanResult};

/// Trait for building instructions with consistent patterns
pub trait InstructionBuilder: AnchorSerialize {
    /// The 8-byte instruction discriminator
    const DISCRIMINATOR: [u8; 8];

    /// Build the instruction data (discriminator + serialized args)
    fn build_data(&self) -> DexloanResult<Vec<u8>> {
        let mut data = Self::DISCRIMINATOR.to_vec();
        self.serialize(&mut data)
            .map_err(|e| DexloanError::Serialization(e.to_string()))?;
        Ok(data)
    }
}

/// Builder for constructing listings program instructions
pub struct DexloanInstructionBuilder {
    accounts: Vec<AccountMeta>,
    data: Vec<u8>,
}

impl DexloanInstructionBuilder {
    pub fn new() -> Self {
        Self {
            accounts: Vec::new(),
            data: Vec::new(),
        }
    }

    /// Add a writable signer account
    pub fn add_signer(mut self, pubkey: Pubkey) -> Self {
        self.accounts.push(AccountMeta::new(pubkey, true));
        self
    }

    /// Add a readonly signer account
    pub fn add_readonly_signer(mut self, pubkey: Pubkey) -> Self {
        self.accounts.push(AccountMeta::new_readonly(pubkey, true));
        self
    }

    /// Add a writable non-signer account
    pub fn add_writable(mut self, pubkey: Pubkey) -> Self {
        self.accounts.push(AccountMeta::new(pubkey, false));
        self
    }

    /// Add a readonly account
    pub fn add_readonly(mut self, pubkey: Pubkey) -> Self {
        self.accounts.push(AccountMeta::new_readonly(pubkey, false));
        self
    }

    /// Set the instruction data
    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }

    /// Build the final instruction
    pub fn build(self, program_id: Pubkey) -> Instruction {
        Instruction {
            program_id,
            accounts: self.accounts,
            data: self.data,
        }
    }
}

impl Default for DexloanInstructionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Macro for implementing InstructionBuilder for an args struct
#[macro_export]
macro_rules! impl_instruction {
    ($name:ident, $discriminator:expr) => {
        impl $crate::instructions::InstructionBuilder for $name {
            const DISCRIMINATOR: [u8; 8] = $discriminator;
        }
    };
}
