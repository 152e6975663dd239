//! Query builders and conditional transitions for negotiation rooms.

use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::query_builder::QueryFragment;
use diesel_async::methods::LoadQuery;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::db::enums::{CompletionSide, RoomStatus};
use crate::db::schema::message_rooms;
use crate::model::room::{MessageRoom, NewMessageRoom};

/// ## Summary
/// Returns a query to find a room by ID.
#[must_use]
pub fn by_id(id: uuid::Uuid) -> message_rooms::BoxedQuery<'static, diesel::pg::Pg> {
    message_rooms::table
        .filter(message_rooms::id.eq(id))
        .into_boxed()
}

/// ## Summary
/// Returns a query to find the room opened for a request.
#[must_use]
pub fn by_request(request_id: i32) -> message_rooms::BoxedQuery<'static, diesel::pg::Pg> {
    message_rooms::table
        .filter(message_rooms::request_id.eq(request_id))
        .into_boxed()
}

/// ## Summary
/// Inserts a room and returns the stored row.
///
/// ## Errors
/// Returns a database error if the insert fails, including a unique violation
/// when the request already has a room.
pub async fn insert_room(
    conn: &mut AsyncPgConnection,
    new_room: &NewMessageRoom,
) -> QueryResult<MessageRoom> {
    diesel::insert_into(message_rooms::table)
        .values(new_room)
        .returning(MessageRoom::as_returning())
        .get_result(conn)
        .await
}

/// ## Summary
/// Moves a room from `from` to `to` if it is currently in `from`.
///
/// ## Errors
/// Returns a database error if the update fails.
pub async fn transition(
    conn: &mut AsyncPgConnection,
    id: uuid::Uuid,
    from: RoomStatus,
    to: RoomStatus,
) -> QueryResult<Option<MessageRoom>> {
    diesel::update(
        message_rooms::table
            .filter(message_rooms::id.eq(id))
            .filter(message_rooms::status.eq(from)),
    )
    .set((
        message_rooms::status.eq(to),
        message_rooms::updated_at.eq(diesel::dsl::now),
    ))
    .returning(MessageRoom::as_returning())
    .get_result(conn)
    .await
    .optional()
}

/// ## Summary
/// Returns the statement writing the hospital's completion flag on an
/// `accepted` room.
#[must_use]
pub fn hospital_flag_statement(
    id: uuid::Uuid,
    completed: bool,
) -> impl LoadQuery<'static, AsyncPgConnection, MessageRoom> + QueryFragment<Pg> {
    diesel::update(
        message_rooms::table
            .filter(message_rooms::id.eq(id))
            .filter(message_rooms::status.eq(RoomStatus::Accepted)),
    )
    .set((
        message_rooms::hospital_completed.eq(completed),
        message_rooms::updated_at.eq(diesel::dsl::now),
    ))
    .returning(MessageRoom::as_returning())
}

/// ## Summary
/// Returns the statement writing the facility's completion flag on an
/// `accepted` room.
#[must_use]
pub fn facility_flag_statement(
    id: uuid::Uuid,
    completed: bool,
) -> impl LoadQuery<'static, AsyncPgConnection, MessageRoom> + QueryFragment<Pg> {
    diesel::update(
        message_rooms::table
            .filter(message_rooms::id.eq(id))
            .filter(message_rooms::status.eq(RoomStatus::Accepted)),
    )
    .set((
        message_rooms::facility_completed.eq(completed),
        message_rooms::updated_at.eq(diesel::dsl::now),
    ))
    .returning(MessageRoom::as_returning())
}

/// ## Summary
/// Writes one side's completion flag while the room is `accepted`.
///
/// ## Errors
/// Returns a database error if the update fails.
pub async fn set_completion_flag(
    conn: &mut AsyncPgConnection,
    id: uuid::Uuid,
    side: CompletionSide,
    completed: bool,
) -> QueryResult<Option<MessageRoom>> {
    let updated = match side {
        CompletionSide::Hospital => hospital_flag_statement(id, completed).get_result(conn).await,
        CompletionSide::Facility => facility_flag_statement(id, completed).get_result(conn).await,
    };

    updated.optional()
}

/// ## Summary
/// Returns the statement flipping an `accepted` room to `completed`. It only
/// matches once both completion flags are set.
#[must_use]
pub fn complete_if_both_statement(
    id: uuid::Uuid,
) -> impl LoadQuery<'static, AsyncPgConnection, MessageRoom> + QueryFragment<Pg> {
    diesel::update(
        message_rooms::table
            .filter(message_rooms::id.eq(id))
            .filter(message_rooms::status.eq(RoomStatus::Accepted))
            .filter(message_rooms::hospital_completed)
            .filter(message_rooms::facility_completed),
    )
    .set((
        message_rooms::status.eq(RoomStatus::Completed),
        message_rooms::updated_at.eq(diesel::dsl::now),
    ))
    .returning(MessageRoom::as_returning())
}

/// ## Summary
/// Flips an `accepted` room to `completed` when both flags are set.
///
/// ## Errors
/// Returns a database error if the update fails.
pub async fn complete_if_both(
    conn: &mut AsyncPgConnection,
    id: uuid::Uuid,
) -> QueryResult<Option<MessageRoom>> {
    complete_if_both_statement(id)
        .get_result(conn)
        .await
        .optional()
}
