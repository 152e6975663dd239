//! Request ledger: placement requests and their `pending -> accepted | rejected`
//! transition.
//!
//! Accepting a request opens its negotiation room in the same atomic store
//! operation; there is no state in which a request is accepted without a room.

use placement_core::constants::{PATIENT_AGE_MAX, PATIENT_AGE_MIN};
use placement_core::types::Identity;
use placement_db::db::enums::RequestStatus;
use placement_db::model::request::{PatientFields, PlacementRequest};
use placement_db::model::room::MessageRoom;
use placement_db::store::{Party, PlacementStore};

use crate::error::{ServiceError, ServiceResult};
use crate::identity::{require_party, resolve_party};

/// Result of accepting a request.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AcceptOutcome {
    pub request: PlacementRequest,
    pub room: MessageRoom,
    /// `false` when the request had already been accepted and the existing
    /// room is returned.
    pub created: bool,
}

/// ## Summary
/// Checks and normalizes patient fields.
///
/// ## Errors
/// `Validation` if the age is out of range or the gender is blank.
pub fn validate_patient(patient: &PatientFields) -> ServiceResult<PatientFields> {
    if !(PATIENT_AGE_MIN..=PATIENT_AGE_MAX).contains(&patient.age) {
        return Err(ServiceError::Validation(format!(
            "patient age must be between {PATIENT_AGE_MIN} and {PATIENT_AGE_MAX}"
        )));
    }

    let gender = patient.gender.trim();
    if gender.is_empty() {
        return Err(ServiceError::Validation(
            "patient gender is required".into(),
        ));
    }

    Ok(PatientFields {
        age: patient.age,
        gender: gender.to_string(),
        condition: patient.condition.trim().to_string(),
    })
}

async fn load_request(store: &dyn PlacementStore, id: i32) -> ServiceResult<PlacementRequest> {
    store
        .request_by_id(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("request {id}")))
}

fn forbid(action: &str, request_id: i32) -> ServiceError {
    tracing::warn!(request_id, action, "Caller does not own request");
    ServiceError::Forbidden(format!("cannot {action} request {request_id}"))
}

/// Loads a request and requires the caller's party to be on the given side of it.
async fn owned_request(
    store: &dyn PlacementStore,
    identity: &Identity,
    id: i32,
    hospital_side: bool,
    action: &str,
) -> ServiceResult<PlacementRequest> {
    let request = load_request(store, id).await?;
    let party = require_party(store, identity).await?;

    let allowed = match party {
        Party::Hospital(hospital_id) => hospital_side && request.hospital_id == hospital_id,
        Party::Facility(facility_id) => !hospital_side && request.facility_id == facility_id,
    };
    if !allowed {
        return Err(forbid(action, id));
    }

    Ok(request)
}

/// A facility removed after the existence check surfaces as a foreign key
/// violation on insert.
fn insert_failure(err: placement_db::error::DbError, facility_id: i32) -> ServiceError {
    if err.is_foreign_key_violation() {
        ServiceError::NotFound(format!("facility {facility_id}"))
    } else {
        err.into()
    }
}

fn not_pending(request: &PlacementRequest) -> ServiceError {
    ServiceError::InvalidState(format!(
        "request {} is {}, not pending",
        request.id, request.status
    ))
}

/// ## Summary
/// Creates a pending request from the caller's hospital to `facility_id`.
///
/// ## Errors
/// `Forbidden` unless the caller is a hospital, `Validation` for bad patient
/// fields, `NotFound` if the facility does not exist.
#[tracing::instrument(skip(store, patient), fields(age = patient.age))]
pub async fn create_request(
    store: &dyn PlacementStore,
    identity: &Identity,
    facility_id: i32,
    patient: &PatientFields,
) -> ServiceResult<PlacementRequest> {
    let Party::Hospital(hospital_id) = require_party(store, identity).await? else {
        return Err(ServiceError::Forbidden(
            "only hospitals can create requests".into(),
        ));
    };
    let patient = validate_patient(patient)?;

    if store.facility_by_id(facility_id).await?.is_none() {
        return Err(ServiceError::NotFound(format!("facility {facility_id}")));
    }

    let request = store
        .insert_request(hospital_id, facility_id, &patient)
        .await
        .map_err(|err| insert_failure(err, facility_id))?;
    tracing::info!(request_id = request.id, hospital_id, facility_id, "Request created");

    Ok(request)
}

/// ## Summary
/// Replaces the patient fields of a pending request.
///
/// ## Errors
/// `NotFound`, `Forbidden` unless the caller's hospital owns the request,
/// `Validation`, or `InvalidState` once the request has been decided.
#[tracing::instrument(skip(store, patient), fields(age = patient.age))]
pub async fn update_request(
    store: &dyn PlacementStore,
    identity: &Identity,
    id: i32,
    patient: &PatientFields,
) -> ServiceResult<PlacementRequest> {
    let request = owned_request(store, identity, id, true, "update").await?;
    let patient = validate_patient(patient)?;
    if request.status != RequestStatus::Pending {
        return Err(not_pending(&request));
    }

    match store.update_pending_request(id, &patient).await? {
        Some(updated) => {
            tracing::info!(request_id = id, "Request updated");
            Ok(updated)
        }
        None => Err(not_pending(&load_request(store, id).await?)),
    }
}

/// ## Summary
/// Deletes a pending request.
///
/// ## Errors
/// `NotFound`, `Forbidden` unless the caller's hospital owns the request, or
/// `InvalidState` once the request has been decided.
#[tracing::instrument(skip(store))]
pub async fn cancel_request(
    store: &dyn PlacementStore,
    identity: &Identity,
    id: i32,
) -> ServiceResult<()> {
    let request = owned_request(store, identity, id, true, "cancel").await?;
    if request.status != RequestStatus::Pending {
        return Err(not_pending(&request));
    }

    if store.delete_pending_request(id).await? {
        tracing::info!(request_id = id, "Request cancelled");
        Ok(())
    } else {
        Err(not_pending(&load_request(store, id).await?))
    }
}

/// ## Summary
/// Accepts a pending request and opens its negotiation room.
///
/// Accepting an already accepted request returns the existing room with
/// `created = false`, so a retry after `Conflict` is safe.
///
/// ## Errors
/// `NotFound`, `Forbidden` unless the caller's facility is the target,
/// `InvalidState` if the request was rejected.
#[tracing::instrument(skip(store))]
pub async fn accept_request(
    store: &dyn PlacementStore,
    identity: &Identity,
    id: i32,
) -> ServiceResult<AcceptOutcome> {
    let request = owned_request(store, identity, id, false, "accept").await?;

    if request.status == RequestStatus::Pending {
        if let Some((request, room)) = store.promote_request(id).await? {
            tracing::info!(request_id = id, room_id = %room.id, "Request accepted, room opened");
            return Ok(AcceptOutcome {
                request,
                room,
                created: true,
            });
        }
    }

    // Either already decided, or another caller promoted it first.
    let current = load_request(store, id).await?;
    match current.status {
        RequestStatus::Accepted => {
            let room = store.room_by_request(id).await?.ok_or_else(|| {
                ServiceError::Conflict(format!("request {id} is accepted but has no room yet"))
            })?;
            tracing::debug!(request_id = id, room_id = %room.id, "Request already accepted");
            Ok(AcceptOutcome {
                request: current,
                room,
                created: false,
            })
        }
        RequestStatus::Rejected => Err(ServiceError::InvalidState(format!(
            "request {id} was rejected"
        ))),
        RequestStatus::Pending => Err(ServiceError::Conflict(format!(
            "request {id} changed while accepting"
        ))),
    }
}

/// ## Summary
/// Rejects a pending request. Rejecting an already rejected request succeeds.
///
/// ## Errors
/// `NotFound`, `Forbidden` unless the caller's facility is the target,
/// `InvalidState` if the request was accepted.
#[tracing::instrument(skip(store))]
pub async fn reject_request(
    store: &dyn PlacementStore,
    identity: &Identity,
    id: i32,
) -> ServiceResult<PlacementRequest> {
    let request = owned_request(store, identity, id, false, "reject").await?;

    if request.status == RequestStatus::Pending {
        if let Some(rejected) = store.reject_pending_request(id).await? {
            tracing::info!(request_id = id, "Request rejected");
            return Ok(rejected);
        }
    }

    let current = load_request(store, id).await?;
    match current.status {
        RequestStatus::Rejected => {
            tracing::debug!(request_id = id, "Request already rejected");
            Ok(current)
        }
        RequestStatus::Accepted => Err(ServiceError::InvalidState(format!(
            "request {id} was accepted"
        ))),
        RequestStatus::Pending => Err(ServiceError::Conflict(format!(
            "request {id} changed while rejecting"
        ))),
    }
}

/// ## Summary
/// Returns a request the caller's hospital created or facility received.
///
/// ## Errors
/// `NotFound`, or `Forbidden` if the caller is on neither side.
#[tracing::instrument(skip(store))]
pub async fn get_request(
    store: &dyn PlacementStore,
    identity: &Identity,
    id: i32,
) -> ServiceResult<PlacementRequest> {
    let request = load_request(store, id).await?;
    match resolve_party(store, identity).await? {
        Some(party) if party.owns_request(&request) => Ok(request),
        _ => Err(forbid("view", id)),
    }
}

/// ## Summary
/// Returns the room opened for a request, if it has been accepted.
///
/// ## Errors
/// As [`get_request`].
#[tracing::instrument(skip(store))]
pub async fn room_for_request(
    store: &dyn PlacementStore,
    identity: &Identity,
    id: i32,
) -> ServiceResult<Option<MessageRoom>> {
    let request = get_request(store, identity, id).await?;
    Ok(store.room_by_request(request.id).await?)
}

/// ## Summary
/// Requests created by a hospital, newest first.
///
/// ## Errors
/// `Unavailable` if the store fails.
pub async fn list_for_hospital(
    store: &dyn PlacementStore,
    hospital_id: i32,
) -> ServiceResult<Vec<PlacementRequest>> {
    Ok(store.requests_for(Party::Hospital(hospital_id)).await?)
}

/// ## Summary
/// Requests addressed to a facility, newest first.
///
/// ## Errors
/// `Unavailable` if the store fails.
pub async fn list_for_facility(
    store: &dyn PlacementStore,
    facility_id: i32,
) -> ServiceResult<Vec<PlacementRequest>> {
    Ok(store.requests_for(Party::Facility(facility_id)).await?)
}

/// ## Summary
/// Lists the caller's requests: sent for hospitals, received for facilities.
///
/// ## Errors
/// `Forbidden` for callers without an owned entity.
#[tracing::instrument(skip(store))]
pub async fn list_requests(
    store: &dyn PlacementStore,
    identity: &Identity,
) -> ServiceResult<Vec<PlacementRequest>> {
    match require_party(store, identity).await? {
        Party::Hospital(id) => list_for_hospital(store, id).await,
        Party::Facility(id) => list_for_facility(store, id).await,
    }
}
