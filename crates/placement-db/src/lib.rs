//! Storage collaborator for the placement workflow.
//!
//! Holds the diesel schema and models, the [`store::PlacementStore`] seam the
//! service layer is written against, and its two implementations: [`pg::PgStore`]
//! over a bb8 pool of async `PostgreSQL` connections and [`memory::MemoryStore`]
//! for tests and single-process deployments.

pub mod db;
pub mod error;
pub mod memory;
pub mod model;
pub mod pg;
pub mod store;
