/// Protocol constants shared by every Dexloan client component
use anchor_lang::prelude::Pubkey;
use solana_program::pubkey;

// ============================================================================
// Program Identifiers
// ============================================================================

/// Dexloan listings program
pub const PROGRAM_ID: Pubkey = pubkey!("H6FCxCy2KCPJwCoUb9eQCSv41WZBKQaYfB6x5oFajzfj");

/// Metaplex token metadata program
pub const METADATA_PROGRAM_ID: Pubkey = pubkey!("metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s");

/// Get the program ID as a Pubkey
pub fn program_id() -> Pubkey {
    PROGRAM_ID
}

/// Seeds for program-derived addresses
pub mod seeds {
    pub const LOAN: &[u8] = b"loan";
    pub const LOAN_OFFER: &[u8] = b"loan_offer";
    pub const CALL_OPTION: &[u8] = b"call_option";
    pub const HIRE: &[u8] = b"hire";
    pub const HIRE_ESCROW: &[u8] = b"hire_escrow";
    pub const COLLECTION: &[u8] = b"collection";
    pub const METADATA: &[u8] = b"metadata";
    pub const EDITION: &[u8] = b"edition";
}

// ============================================================================
// Time Constants
// ============================================================================

/// Seconds in a (non-leap) year, used for annualized rates
pub const SECONDS_PER_YEAR: i64 = 31_536_000;

/// Seconds in a day
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Days per month used when presenting durations in months
pub const DAYS_PER_MONTH: i64 = 30;

// ============================================================================
// Amount Constants
// ============================================================================

/// Lamports in one SOL
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Basis points denominator (10,000 = 100%)
pub const BASIS_POINTS_DIVISOR: u64 = 10_000;

/// Flat penalty applied to overdue loans (5%)
pub const LATE_REPAYMENT_FEE_BASIS_POINTS: u64 = 500;

/// Currency glyph appended to formatted amounts
pub const SOL_SYMBOL: &str = "◎";

// ============================================================================
// Offer Constants
// ============================================================================

/// Highest offer id a lender may hold per collection
pub const MAX_OFFER_ID: u8 = 255;

// ============================================================================
// Account Layout Constants
// ============================================================================

/// Anchor discriminator size (8 bytes)
pub const DISCRIMINATOR_SIZE: usize = 8;

/// Borsh tag written in front of a present `Option` value
pub const OPTION_SOME_TAG: u8 = 1;
