//! Optimistic query cache
//!
//! Mutations stage predicted patches into every cached query group they can
//! affect, submit, then commit or roll back. Authoritative reads replace an
//! entry and retire its pending patches.

mod patch;
mod query;
mod reconciler;
mod store;

pub use patch::*;
pub use query::*;
pub use reconciler::*;
pub use store::*;
