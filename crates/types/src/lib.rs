/// Shared types for Dexloan clients
///
/// This crate provides the ledger record layouts, constants, and the error
/// taxonomy used by the math and SDK crates.

pub mod constants;
pub mod errors;
pub mod serde_helpers;
pub mod state;

// Re-export all public types
pub use constants::*;
pub use errors::*;
pub use state::*;

/// Result type alias using the shared error type
pub type DexloanResult<T> = std::result::Result<T, DexloanError>;
