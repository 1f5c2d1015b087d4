//! Collaborator traits consumed by the review engine.
//!
//! Storage is synchronous: every call may block on the backing store and
//! failures are propagated to the caller without retry.

mod memo_store;
mod review_ledger;
mod setting_store;

pub use memo_store::*;
pub use review_ledger::*;
pub use setting_store::*;
