//! The storage seam the workflow is written against.
//!
//! [`PlacementStore`] is object safe so it can be injected as
//! `Arc<dyn PlacementStore>`. Every write that depends on current state is a
//! conditional write: it returns the updated row when the condition held and
//! `None` otherwise, leaving the caller to re-read and decide why.

use futures::future::BoxFuture;

use crate::db::enums::{CompletionSide, RoomStatus};
use crate::db::query::activity::RoomSummaryRow;
use crate::error::DbResult;
use crate::model::message::Message;
use crate::model::party::{Facility, Hospital};
use crate::model::request::{PatientFields, PlacementRequest};
use crate::model::room::MessageRoom;
use crate::model::room_file::{NewRoomFile, RoomFile};

pub type StoreFuture<'a, T> = BoxFuture<'a, DbResult<T>>;

/// The entity a caller acts for, re-derived from their user id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Party {
    Hospital(i32),
    Facility(i32),
}

impl Party {
    /// Whether this party created or is the target of `request`.
    #[must_use]
    pub const fn owns_request(self, request: &PlacementRequest) -> bool {
        match self {
            Self::Hospital(id) => request.hospital_id == id,
            Self::Facility(id) => request.facility_id == id,
        }
    }

    /// The side of `room` this party occupies, if any.
    #[must_use]
    pub const fn side_in(self, room: &MessageRoom) -> Option<CompletionSide> {
        match self {
            Self::Hospital(id) if room.hospital_id == id => Some(CompletionSide::Hospital),
            Self::Facility(id) if room.facility_id == id => Some(CompletionSide::Facility),
            Self::Hospital(_) | Self::Facility(_) => None,
        }
    }
}

/// A room as shown in a participant's room list.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RoomSummary {
    #[serde(flatten)]
    pub room: MessageRoom,
    pub hospital_name: String,
    pub facility_name: String,
    pub patient: PatientFields,
    pub last_message: Option<String>,
    pub last_message_at: Option<chrono::DateTime<chrono::Utc>>,
    pub has_unread: bool,
}

impl From<RoomSummaryRow> for RoomSummary {
    fn from(row: RoomSummaryRow) -> Self {
        Self {
            room: row.room,
            hospital_name: row.hospital_name,
            facility_name: row.facility_name,
            patient: PatientFields {
                age: row.patient_age,
                gender: row.patient_gender,
                condition: row.medical_condition,
            },
            last_message: row.last_message,
            last_message_at: row.last_message_at,
            has_unread: row.has_unread,
        }
    }
}

/// Storage operations for requests, rooms, conversation entries and watermarks.
pub trait PlacementStore: Send + Sync {
    // Parties

    fn hospital_by_user(&self, user_id: i32) -> StoreFuture<'_, Option<Hospital>>;

    fn facility_by_user(&self, user_id: i32) -> StoreFuture<'_, Option<Facility>>;

    fn facility_by_id(&self, facility_id: i32) -> StoreFuture<'_, Option<Facility>>;

    // Requests

    fn insert_request<'a>(
        &'a self,
        hospital_id: i32,
        facility_id: i32,
        patient: &'a PatientFields,
    ) -> StoreFuture<'a, PlacementRequest>;

    fn request_by_id(&self, id: i32) -> StoreFuture<'_, Option<PlacementRequest>>;

    /// Requests created by (hospital) or addressed to (facility) the party, newest first.
    fn requests_for(&self, party: Party) -> StoreFuture<'_, Vec<PlacementRequest>>;

    fn update_pending_request<'a>(
        &'a self,
        id: i32,
        patient: &'a PatientFields,
    ) -> StoreFuture<'a, Option<PlacementRequest>>;

    /// Deletes the request if it is still pending; `false` otherwise.
    fn delete_pending_request(&self, id: i32) -> StoreFuture<'_, bool>;

    fn reject_pending_request(&self, id: i32) -> StoreFuture<'_, Option<PlacementRequest>>;

    /// Atomically moves a pending request to `accepted` and opens its room.
    ///
    /// Returns `None`, with nothing written, when the request is not pending.
    fn promote_request(
        &self,
        id: i32,
    ) -> StoreFuture<'_, Option<(PlacementRequest, MessageRoom)>>;

    // Rooms

    fn room_by_id(&self, id: uuid::Uuid) -> StoreFuture<'_, Option<MessageRoom>>;

    fn room_by_request(&self, request_id: i32) -> StoreFuture<'_, Option<MessageRoom>>;

    fn transition_room(
        &self,
        id: uuid::Uuid,
        from: RoomStatus,
        to: RoomStatus,
    ) -> StoreFuture<'_, Option<MessageRoom>>;

    /// Writes one side's completion flag on an `accepted` room and, in the same
    /// atomic unit, flips the room to `completed` once both flags are set.
    fn set_completion(
        &self,
        id: uuid::Uuid,
        side: CompletionSide,
        completed: bool,
    ) -> StoreFuture<'_, Option<MessageRoom>>;

    /// The party's rooms, most recent activity first, with unread state for `viewer_id`.
    fn room_summaries(&self, party: Party, viewer_id: i32) -> StoreFuture<'_, Vec<RoomSummary>>;

    // Conversation

    fn insert_message<'a>(
        &'a self,
        room_id: uuid::Uuid,
        sender_id: i32,
        text: &'a str,
    ) -> StoreFuture<'a, Message>;

    fn messages_for_room(&self, room_id: uuid::Uuid) -> StoreFuture<'_, Vec<Message>>;

    fn insert_room_file<'a>(&'a self, file: NewRoomFile<'a>) -> StoreFuture<'a, RoomFile>;

    fn room_files(&self, room_id: uuid::Uuid) -> StoreFuture<'_, Vec<RoomFile>>;

    fn room_file_by_id(&self, id: i32) -> StoreFuture<'_, Option<RoomFile>>;

    fn delete_room_file(&self, id: i32) -> StoreFuture<'_, bool>;

    // Activity

    fn unread_room_count(&self, party: Party, user_id: i32) -> StoreFuture<'_, i64>;

    fn unread_request_count(&self, party: Party, user_id: i32) -> StoreFuture<'_, i64>;

    fn mark_room_read(&self, room_id: uuid::Uuid, user_id: i32) -> StoreFuture<'_, ()>;

    fn mark_request_read(&self, request_id: i32, user_id: i32) -> StoreFuture<'_, ()>;

    /// Bumps the watermark on every request the party owns; returns how many.
    fn mark_all_requests_read(&self, party: Party, user_id: i32) -> StoreFuture<'_, usize>;
}
