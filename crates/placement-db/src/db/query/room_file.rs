//! Query builders for room file attachments.

use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::db::schema::room_files;
use crate::model::room_file::{NewRoomFile, RoomFile};

/// ## Summary
/// Returns a query for a room's files, oldest first.
#[must_use]
pub fn for_room(room_id: uuid::Uuid) -> room_files::BoxedQuery<'static, diesel::pg::Pg> {
    room_files::table
        .filter(room_files::room_id.eq(room_id))
        .order((room_files::created_at.asc(), room_files::id.asc()))
        .into_boxed()
}

/// ## Summary
/// Returns a query to find a file by ID.
#[must_use]
pub fn by_id(id: i32) -> room_files::BoxedQuery<'static, diesel::pg::Pg> {
    room_files::table.filter(room_files::id.eq(id)).into_boxed()
}

/// ## Summary
/// Records metadata for a stored file.
///
/// ## Errors
/// Returns a database error if the insert fails.
pub async fn insert_room_file(
    conn: &mut AsyncPgConnection,
    new_file: &NewRoomFile<'_>,
) -> QueryResult<RoomFile> {
    diesel::insert_into(room_files::table)
        .values(new_file)
        .returning(RoomFile::as_returning())
        .get_result(conn)
        .await
}

/// ## Summary
/// Removes a file's metadata row.
///
/// ## Errors
/// Returns a database error if the delete fails.
pub async fn delete_room_file(conn: &mut AsyncPgConnection, id: i32) -> QueryResult<bool> {
    let deleted = diesel::delete(room_files::table.filter(room_files::id.eq(id)))
        .execute(conn)
        .await?;

    Ok(deleted == 1)
}
