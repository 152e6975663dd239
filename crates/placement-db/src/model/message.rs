use diesel::{pg::Pg, prelude::*};

use crate::db::schema;

/// Append-only text entry in a room.
#[derive(
    Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, Associations, serde::Serialize,
)]
#[diesel(table_name = schema::messages)]
#[diesel(belongs_to(crate::model::room::MessageRoom, foreign_key = room_id))]
#[diesel(check_for_backend(Pg))]
pub struct Message {
    pub id: i32,
    pub room_id: uuid::Uuid,
    pub sender_id: i32,
    pub message_text: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::messages)]
pub struct NewMessage<'a> {
    pub room_id: uuid::Uuid,
    pub sender_id: i32,
    pub message_text: &'a str,
}
