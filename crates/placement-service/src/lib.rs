//! The placement negotiation workflow.
//!
//! Each module is a set of free async functions over a
//! [`PlacementStore`](placement_db::store::PlacementStore) and the caller's
//! [`Identity`](placement_core::types::Identity). Ownership is always
//! re-derived from the store; the identity's role only selects which kind of
//! record to look for.

pub mod activity;
pub mod conversation;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod room;
pub mod storage;
