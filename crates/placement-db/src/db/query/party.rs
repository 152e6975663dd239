//! Query builders for hospitals and facilities.

use diesel::prelude::*;

use crate::db::schema::{facilities, hospitals};

/// ## Summary
/// Returns a query to find the hospital owned by a user.
#[must_use]
pub fn hospital_by_user(user_id: i32) -> hospitals::BoxedQuery<'static, diesel::pg::Pg> {
    hospitals::table
        .filter(hospitals::user_id.eq(user_id))
        .into_boxed()
}

/// ## Summary
/// Returns a query to find the facility owned by a user.
#[must_use]
pub fn facility_by_user(user_id: i32) -> facilities::BoxedQuery<'static, diesel::pg::Pg> {
    facilities::table
        .filter(facilities::user_id.eq(user_id))
        .into_boxed()
}

/// ## Summary
/// Returns a query to find a facility by ID.
#[must_use]
pub fn facility_by_id(id: i32) -> facilities::BoxedQuery<'static, diesel::pg::Pg> {
    facilities::table.filter(facilities::id.eq(id)).into_boxed()
}
