//! Query builders and conditional writes for placement requests.

use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::query_builder::QueryFragment;
use diesel_async::methods::LoadQuery;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::db::enums::RequestStatus;
use crate::db::schema::placement_requests;
use crate::model::request::{NewPlacementRequest, PatientFields, PlacementRequest};

/// ## Summary
/// Returns a query to find a request by ID.
#[must_use]
pub fn by_id(id: i32) -> placement_requests::BoxedQuery<'static, diesel::pg::Pg> {
    placement_requests::table
        .filter(placement_requests::id.eq(id))
        .into_boxed()
}

/// ## Summary
/// Returns a query for every request created by a hospital, newest first.
#[must_use]
pub fn for_hospital(hospital_id: i32) -> placement_requests::BoxedQuery<'static, diesel::pg::Pg> {
    placement_requests::table
        .filter(placement_requests::hospital_id.eq(hospital_id))
        .order((
            placement_requests::created_at.desc(),
            placement_requests::id.desc(),
        ))
        .into_boxed()
}

/// ## Summary
/// Returns a query for every request addressed to a facility, newest first.
#[must_use]
pub fn for_facility(facility_id: i32) -> placement_requests::BoxedQuery<'static, diesel::pg::Pg> {
    placement_requests::table
        .filter(placement_requests::facility_id.eq(facility_id))
        .order((
            placement_requests::created_at.desc(),
            placement_requests::id.desc(),
        ))
        .into_boxed()
}

/// ## Summary
/// Inserts a new request and returns the stored row.
///
/// ## Errors
/// Returns a database error if the insert fails.
pub async fn insert_request(
    conn: &mut AsyncPgConnection,
    new_request: &NewPlacementRequest<'_>,
) -> QueryResult<PlacementRequest> {
    diesel::insert_into(placement_requests::table)
        .values(new_request)
        .returning(PlacementRequest::as_returning())
        .get_result(conn)
        .await
}

/// ## Summary
/// Replaces the patient fields of a request that is still pending.
///
/// ## Returns
/// `None` when the request does not exist or has left `pending`.
///
/// ## Errors
/// Returns a database error if the update fails.
pub async fn update_pending_patient(
    conn: &mut AsyncPgConnection,
    id: i32,
    patient: &PatientFields,
) -> QueryResult<Option<PlacementRequest>> {
    diesel::update(
        placement_requests::table
            .filter(placement_requests::id.eq(id))
            .filter(placement_requests::status.eq(RequestStatus::Pending)),
    )
    .set((
        placement_requests::patient_age.eq(patient.age),
        placement_requests::patient_gender.eq(&patient.gender),
        placement_requests::medical_condition.eq(&patient.condition),
        placement_requests::updated_at.eq(diesel::dsl::now),
    ))
    .returning(PlacementRequest::as_returning())
    .get_result(conn)
    .await
    .optional()
}

/// ## Summary
/// Returns the statement moving a request out of `pending` into `status`.
///
/// The `status = 'pending'` predicate is part of the UPDATE, so of two
/// concurrent callers only one gets a row back.
#[must_use]
pub fn settle_pending_statement(
    id: i32,
    status: RequestStatus,
) -> impl LoadQuery<'static, AsyncPgConnection, PlacementRequest> + QueryFragment<Pg> {
    diesel::update(
        placement_requests::table
            .filter(placement_requests::id.eq(id))
            .filter(placement_requests::status.eq(RequestStatus::Pending)),
    )
    .set((
        placement_requests::status.eq(status),
        placement_requests::updated_at.eq(diesel::dsl::now),
    ))
    .returning(PlacementRequest::as_returning())
}

/// ## Summary
/// Moves a request out of `pending` into `status`.
///
/// ## Returns
/// `None` when the request does not exist or has already left `pending`.
///
/// ## Errors
/// Returns a database error if the update fails.
pub async fn settle_pending(
    conn: &mut AsyncPgConnection,
    id: i32,
    status: RequestStatus,
) -> QueryResult<Option<PlacementRequest>> {
    settle_pending_statement(id, status)
        .get_result(conn)
        .await
        .optional()
}

/// ## Summary
/// Deletes a request if it is still pending.
///
/// ## Errors
/// Returns a database error if the delete fails.
pub async fn delete_pending(conn: &mut AsyncPgConnection, id: i32) -> QueryResult<bool> {
    let deleted = diesel::delete(
        placement_requests::table
            .filter(placement_requests::id.eq(id))
            .filter(placement_requests::status.eq(RequestStatus::Pending)),
    )
    .execute(conn)
    .await?;

    Ok(deleted == 1)
}
