use diesel::{pg::Pg, prelude::*};

use crate::db::schema;

/// Metadata for a file attached to a room. The bytes live in file storage at
/// `file_path`.
#[derive(
    Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, Associations, serde::Serialize,
)]
#[diesel(table_name = schema::room_files)]
#[diesel(belongs_to(crate::model::room::MessageRoom, foreign_key = room_id))]
#[diesel(check_for_backend(Pg))]
pub struct RoomFile {
    pub id: i32,
    pub room_id: uuid::Uuid,
    pub sender_id: i32,
    pub file_name: String,
    #[serde(skip_serializing)]
    pub file_path: String,
    pub file_type: String,
    pub file_size: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::room_files)]
pub struct NewRoomFile<'a> {
    pub room_id: uuid::Uuid,
    pub sender_id: i32,
    pub file_name: &'a str,
    pub file_path: &'a str,
    pub file_type: &'a str,
    pub file_size: i64,
}
