//! Shared types for the placement negotiation workspace.
//!
//! This crate has no storage or transport dependencies; everything here can be
//! used from any layer.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
pub mod util;
