//! Workflow behaviour against the in-memory store.

mod common;
mod conversation;
mod ledger;
mod room;
