use diesel::{pg::Pg, prelude::*};

use crate::db::schema;

/// Hospital account; one per hospital user.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, serde::Serialize)]
#[diesel(table_name = schema::hospitals)]
#[diesel(check_for_backend(Pg))]
pub struct Hospital {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::hospitals)]
pub struct NewHospital<'a> {
    pub user_id: i32,
    pub name: &'a str,
}

/// Care facility offering beds; one per facility user.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, serde::Serialize)]
#[diesel(table_name = schema::facilities)]
#[diesel(check_for_backend(Pg))]
pub struct Facility {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::facilities)]
pub struct NewFacility<'a> {
    pub user_id: i32,
    pub name: &'a str,
}
