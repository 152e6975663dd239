//! Query builders and statement helpers, one module per table family.
//!
//! Builders return boxed queries so callers can add `select`/`first`/`load`
//! themselves; helpers that write return the affected row when the write's
//! condition held and `None` when it did not.

pub mod activity;
pub mod message;
pub mod party;
pub mod request;
pub mod room;
pub mod room_file;

#[cfg(test)]
pub(crate) fn sql_of<Q>(query: &Q) -> String
where
    Q: diesel::query_builder::QueryFragment<diesel::pg::Pg>,
{
    diesel::debug_query::<diesel::pg::Pg, _>(query).to_string()
}
