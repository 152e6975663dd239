use diesel::{pg::Pg, prelude::*};

use crate::db::schema;

/// Per-(room, user) read watermark.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable)]
#[diesel(table_name = schema::message_read_status)]
#[diesel(check_for_backend(Pg))]
pub struct MessageReadStatus {
    pub room_id: uuid::Uuid,
    pub user_id: i32,
    pub last_read_at: chrono::DateTime<chrono::Utc>,
}

/// Per-(request, user) read watermark.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable)]
#[diesel(table_name = schema::request_read_status)]
#[diesel(check_for_backend(Pg))]
pub struct RequestReadStatus {
    pub request_id: i32,
    pub user_id: i32,
    pub last_read_at: chrono::DateTime<chrono::Utc>,
}
