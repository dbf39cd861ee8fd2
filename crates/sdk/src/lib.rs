/// Dexloan client SDK
///
/// Client-side core for peer-to-peer NFT-collateralized loans, call options
/// and hires. Provides:
/// - Deterministic account address derivation
/// - Typed entity models with lifecycle transitions
/// - A ledger gateway over Solana RPC with bounded read retries
/// - An optimistic query cache reconciled against authoritative reads
/// - Query and mutation services tying it all together
pub mod cache;
pub mod client;
pub mod clock;
pub mod config;
pub mod gateway;
pub mod instructions;
pub mod logging;
pub mod metadata;
pub mod model;
pub mod notify;
pub mod pda;
pub mod prelude;
pub mod testing;

pub use client::*;
pub use config::*;
pub use model::*;

pub use dexloan_types::{DexloanError, DexloanResult};
