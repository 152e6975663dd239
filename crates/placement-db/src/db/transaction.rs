//! Transaction helper for the read-modify-write points of the workflow.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use diesel_async::scoped_futures::ScopedFutureExt;
//! use crate::db::transaction::with_transaction;
//!
//! with_transaction(&mut conn, |tx| async move {
//!     request::mark_accepted(tx, request_id).await?;
//!     room::insert_room(tx, &new_room).await?;
//!     Ok(())
//! }.scope_boxed()).await?;
//! ```

use diesel_async::{AsyncConnection, AsyncPgConnection, scoped_futures::ScopedBoxFuture};

use crate::error::{DbError, DbResult};

/// ## Summary
/// Runs `callback` inside a database transaction and returns its result.
///
/// The transaction is rolled back when the callback returns an error.
///
/// ## Errors
/// Returns any error produced by the closure, or errors raised while starting
/// or committing the transaction.
pub async fn with_transaction<'a, T, F>(conn: &mut AsyncPgConnection, callback: F) -> DbResult<T>
where
    F: for<'r> FnOnce(&'r mut AsyncPgConnection) -> ScopedBoxFuture<'a, 'r, DbResult<T>>
        + Send
        + 'a,
    T: Send + 'a,
{
    conn.transaction::<_, DbError, _>(callback).await
}
