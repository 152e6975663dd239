use diesel::{pg::Pg, prelude::*};

use crate::db::{
    enums::{CompletionSide, RoomStatus},
    schema,
};

/// Bilateral negotiation room opened when a request is accepted.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Queryable,
    QueryableByName,
    Selectable,
    Identifiable,
    Associations,
    serde::Serialize,
)]
#[diesel(table_name = schema::message_rooms)]
#[diesel(belongs_to(crate::model::request::PlacementRequest, foreign_key = request_id))]
#[diesel(check_for_backend(Pg))]
pub struct MessageRoom {
    pub id: uuid::Uuid,
    pub request_id: i32,
    pub hospital_id: i32,
    pub facility_id: i32,
    pub status: RoomStatus,
    pub hospital_completed: bool,
    pub facility_completed: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl MessageRoom {
    /// Completion flag for one side of the room.
    #[must_use]
    pub const fn completed_by(&self, side: CompletionSide) -> bool {
        match side {
            CompletionSide::Hospital => self.hospital_completed,
            CompletionSide::Facility => self.facility_completed,
        }
    }

    #[must_use]
    pub const fn both_completed(&self) -> bool {
        self.hospital_completed && self.facility_completed
    }
}

/// Insert struct for opening a room; rooms always start `negotiating`.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::message_rooms)]
pub struct NewMessageRoom {
    pub id: uuid::Uuid,
    pub request_id: i32,
    pub hospital_id: i32,
    pub facility_id: i32,
    pub status: RoomStatus,
}

impl NewMessageRoom {
    #[must_use]
    pub fn for_request(request_id: i32, hospital_id: i32, facility_id: i32) -> Self {
        Self {
            id: uuid::Uuid::now_v7(),
            request_id,
            hospital_id,
            facility_id,
            status: RoomStatus::Negotiating,
        }
    }
}
