//! Query builders for room messages.

use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::db::schema::messages;
use crate::model::message::{Message, NewMessage};

/// ## Summary
/// Returns a query for a room's messages, oldest first.
#[must_use]
pub fn for_room(room_id: uuid::Uuid) -> messages::BoxedQuery<'static, diesel::pg::Pg> {
    messages::table
        .filter(messages::room_id.eq(room_id))
        .order((messages::created_at.asc(), messages::id.asc()))
        .into_boxed()
}

/// ## Summary
/// Appends a message to a room.
///
/// ## Errors
/// Returns a database error if the insert fails.
pub async fn insert_message(
    conn: &mut AsyncPgConnection,
    new_message: &NewMessage<'_>,
) -> QueryResult<Message> {
    diesel::insert_into(messages::table)
        .values(new_message)
        .returning(Message::as_returning())
        .get_result(conn)
        .await
}
