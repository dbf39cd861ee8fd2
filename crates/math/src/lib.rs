/// Financial math for Dexloan clients
///
/// This crate provides checked integer arithmetic, loan interest and fee
/// calculations, valuation helpers, and display formatting used across
/// the SDK and any host applications.

pub mod directory;
pub mod format;
pub mod interest;
pub mod safe;
pub mod valuation;

// Re-export commonly used functions
pub use directory::*;
pub use format::*;
pub use interest::*;
pub use safe::*;
pub use valuation::*;
