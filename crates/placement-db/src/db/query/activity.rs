//! Unread-activity projections and read-watermark writes.
//!
//! The projections are hand-written SQL: they need correlated `EXISTS`
//! subqueries and a lateral join that the diesel DSL cannot express without
//! heavy boxing. The owning column (`hospital_id` or `facility_id`) comes from a
//! closed set, never from input.

use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::query_builder::QueryFragment;
use diesel::sql_types::{BigInt, Bool, Int4, Nullable, Text, Timestamptz};
use diesel_async::methods::ExecuteDsl;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::db::schema::{message_read_status, request_read_status};
use crate::model::room::MessageRoom;
use crate::store::Party;

/// True when the room (`r`) has a message or file from someone other than `$2`
/// newer than the viewer's watermark (`s`), or any such entry and no watermark.
const ROOM_HAS_UNREAD: &str = "(EXISTS (SELECT 1 FROM messages m \
       WHERE m.room_id = r.id AND m.sender_id <> $2 \
       AND (s.last_read_at IS NULL OR m.created_at > s.last_read_at)) \
    OR EXISTS (SELECT 1 FROM room_files f \
       WHERE f.room_id = r.id AND f.sender_id <> $2 \
       AND (s.last_read_at IS NULL OR f.created_at > s.last_read_at)))";

#[derive(Debug, QueryableByName)]
struct CountRow {
    #[diesel(sql_type = BigInt)]
    count: i64,
}

/// One row of the room listing before it is shaped for callers.
#[derive(Debug, QueryableByName)]
pub struct RoomSummaryRow {
    #[diesel(embed)]
    pub room: MessageRoom,
    #[diesel(sql_type = Text)]
    pub hospital_name: String,
    #[diesel(sql_type = Text)]
    pub facility_name: String,
    #[diesel(sql_type = Int4)]
    pub patient_age: i32,
    #[diesel(sql_type = Text)]
    pub patient_gender: String,
    #[diesel(sql_type = Text)]
    pub medical_condition: String,
    #[diesel(sql_type = Nullable<Text>)]
    pub last_message: Option<String>,
    #[diesel(sql_type = Nullable<Timestamptz>)]
    pub last_message_at: Option<chrono::DateTime<chrono::Utc>>,
    #[diesel(sql_type = Bool)]
    pub has_unread: bool,
}

const fn owner(party: Party) -> (&'static str, i32) {
    match party {
        Party::Hospital(id) => ("hospital_id", id),
        Party::Facility(id) => ("facility_id", id),
    }
}

pub(crate) fn unread_room_count_sql(party: Party) -> String {
    let (column, _) = owner(party);
    format!(
        "SELECT COUNT(*) AS count FROM message_rooms r \
         LEFT JOIN message_read_status s ON s.room_id = r.id AND s.user_id = $2 \
         WHERE r.{column} = $1 AND {ROOM_HAS_UNREAD}"
    )
}

pub(crate) fn unread_request_count_sql(party: Party) -> String {
    let (column, _) = owner(party);
    // Facilities are notified of new work; hospitals of decisions on theirs.
    let statuses = match party {
        Party::Hospital(_) => "('accepted', 'rejected')",
        Party::Facility(_) => "('pending')",
    };
    format!(
        "SELECT COUNT(*) AS count FROM placement_requests p \
         LEFT JOIN request_read_status s ON s.request_id = p.id AND s.user_id = $2 \
         WHERE p.{column} = $1 AND p.status IN {statuses} \
         AND (s.last_read_at IS NULL OR p.updated_at > s.last_read_at)"
    )
}

pub(crate) fn room_summaries_sql(party: Party) -> String {
    let (column, _) = owner(party);
    format!(
        "SELECT r.id, r.request_id, r.hospital_id, r.facility_id, r.status, \
                r.hospital_completed, r.facility_completed, r.created_at, r.updated_at, \
                h.name AS hospital_name, f.name AS facility_name, \
                p.patient_age, p.patient_gender, p.medical_condition, \
                lm.message_text AS last_message, lm.created_at AS last_message_at, \
                {ROOM_HAS_UNREAD} AS has_unread \
         FROM message_rooms r \
         JOIN hospitals h ON h.id = r.hospital_id \
         JOIN facilities f ON f.id = r.facility_id \
         JOIN placement_requests p ON p.id = r.request_id \
         LEFT JOIN message_read_status s ON s.room_id = r.id AND s.user_id = $2 \
         LEFT JOIN LATERAL (SELECT message_text, created_at FROM messages \
                            WHERE room_id = r.id \
                            ORDER BY created_at DESC, id DESC LIMIT 1) lm ON TRUE \
         WHERE r.{column} = $1 \
         ORDER BY COALESCE(lm.created_at, r.created_at) DESC, r.id DESC"
    )
}

pub(crate) fn mark_all_requests_read_sql(party: Party) -> String {
    let (column, _) = owner(party);
    format!(
        "INSERT INTO request_read_status (request_id, user_id, last_read_at) \
         SELECT id, $2, now() FROM placement_requests WHERE {column} = $1 \
         ON CONFLICT (request_id, user_id) DO UPDATE SET last_read_at = EXCLUDED.last_read_at"
    )
}

/// ## Summary
/// Counts the party's rooms with activity from others since the user last read them.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn unread_room_count(
    conn: &mut AsyncPgConnection,
    party: Party,
    user_id: i32,
) -> QueryResult<i64> {
    let (_, owner_id) = owner(party);
    let row: CountRow = diesel::sql_query(unread_room_count_sql(party))
        .bind::<Int4, _>(owner_id)
        .bind::<Int4, _>(user_id)
        .get_result(conn)
        .await?;
    Ok(row.count)
}

/// ## Summary
/// Counts the party's requests whose state changed since the user last read them.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn unread_request_count(
    conn: &mut AsyncPgConnection,
    party: Party,
    user_id: i32,
) -> QueryResult<i64> {
    let (_, owner_id) = owner(party);
    let row: CountRow = diesel::sql_query(unread_request_count_sql(party))
        .bind::<Int4, _>(owner_id)
        .bind::<Int4, _>(user_id)
        .get_result(conn)
        .await?;
    Ok(row.count)
}

/// ## Summary
/// Lists the party's rooms, most recent activity first, as seen by `user_id`.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn room_summaries(
    conn: &mut AsyncPgConnection,
    party: Party,
    user_id: i32,
) -> QueryResult<Vec<RoomSummaryRow>> {
    let (_, owner_id) = owner(party);
    diesel::sql_query(room_summaries_sql(party))
        .bind::<Int4, _>(owner_id)
        .bind::<Int4, _>(user_id)
        .load(conn)
        .await
}

/// ## Summary
/// Returns the upsert that moves the user's watermark for a room to the
/// current time, keyed on the `(room_id, user_id)` primary key.
#[must_use]
pub fn mark_room_read_statement(
    room_id: uuid::Uuid,
    user_id: i32,
) -> impl ExecuteDsl<AsyncPgConnection> + QueryFragment<Pg> {
    diesel::insert_into(message_read_status::table)
        .values((
            message_read_status::room_id.eq(room_id),
            message_read_status::user_id.eq(user_id),
            message_read_status::last_read_at.eq(diesel::dsl::now),
        ))
        .on_conflict((message_read_status::room_id, message_read_status::user_id))
        .do_update()
        .set(message_read_status::last_read_at.eq(diesel::dsl::now))
}

/// ## Summary
/// Upserts the user's watermark for a room to the current time.
///
/// ## Errors
/// Returns a database error if the upsert fails.
pub async fn mark_room_read(
    conn: &mut AsyncPgConnection,
    room_id: uuid::Uuid,
    user_id: i32,
) -> QueryResult<()> {
    mark_room_read_statement(room_id, user_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// ## Summary
/// Upserts the user's watermark for a request to the current time.
///
/// ## Errors
/// Returns a database error if the upsert fails.
pub async fn mark_request_read(
    conn: &mut AsyncPgConnection,
    request_id: i32,
    user_id: i32,
) -> QueryResult<()> {
    diesel::insert_into(request_read_status::table)
        .values((
            request_read_status::request_id.eq(request_id),
            request_read_status::user_id.eq(user_id),
            request_read_status::last_read_at.eq(diesel::dsl::now),
        ))
        .on_conflict((request_read_status::request_id, request_read_status::user_id))
        .do_update()
        .set(request_read_status::last_read_at.eq(diesel::dsl::now))
        .execute(conn)
        .await?;
    Ok(())
}

/// ## Summary
/// Bumps the user's watermark on every request the party owns.
///
/// ## Returns
/// The number of watermarks written.
///
/// ## Errors
/// Returns a database error if the upsert fails.
pub async fn mark_all_requests_read(
    conn: &mut AsyncPgConnection,
    party: Party,
    user_id: i32,
) -> QueryResult<usize> {
    let (_, owner_id) = owner(party);
    diesel::sql_query(mark_all_requests_read_sql(party))
        .bind::<Int4, _>(owner_id)
        .bind::<Int4, _>(user_id)
        .execute(conn)
        .await
}
