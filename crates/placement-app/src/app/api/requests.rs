//! `/api/requests`: the request ledger over HTTP.

use salvo::http::StatusCode;
use salvo::{Depot, Request, Response, Router, handler};
use serde::Deserialize;

use super::context::{Caller, int_param, json_body};
use crate::error::{AppError, AppResult, render_empty, render_error, render_result};
use placement_core::constants::REQUESTS_ROUTE_COMPONENT;
use placement_db::model::request::{PatientFields, PlacementRequest};
use placement_db::model::room::MessageRoom;
use placement_service::error::ServiceError;
use placement_service::{activity, ledger};

/// ## Summary
/// Create request payload: the target facility plus the patient fields.
#[derive(Debug, Deserialize)]
pub struct CreateRequestBody {
    pub facility_id: i32,
    #[serde(flatten)]
    pub patient: PatientFields,
}

#[derive(Debug, serde::Serialize)]
struct MarkedRead {
    marked: usize,
}

/// ## Summary
/// POST /api/requests - Sends a new pending request to a facility.
///
/// ## Errors
/// 403 for non-hospital callers, 404 for an unknown facility, 400 for invalid
/// patient fields.
#[handler]
async fn create_request(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let result: AppResult<PlacementRequest> = async {
        let caller = Caller::from_depot(depot)?;
        let body: CreateRequestBody = json_body(req).await?;
        Ok(ledger::create_request(
            caller.store(),
            &caller.identity,
            body.facility_id,
            &body.patient,
        )
        .await?)
    }
    .await;

    render_result(res, StatusCode::CREATED, result);
}

/// ## Summary
/// GET /api/requests - Lists the requests the caller's party sent or received.
#[handler]
async fn list_requests(depot: &mut Depot, res: &mut Response) {
    let result: AppResult<Vec<PlacementRequest>> = async {
        let caller = Caller::from_depot(depot)?;
        Ok(ledger::list_requests(caller.store(), &caller.identity).await?)
    }
    .await;

    render_result(res, StatusCode::OK, result);
}

/// ## Summary
/// POST /api/requests/read-all - Marks every request of the caller's party read.
#[handler]
async fn mark_all_read(depot: &mut Depot, res: &mut Response) {
    let result: AppResult<MarkedRead> = async {
        let caller = Caller::from_depot(depot)?;
        let marked = activity::mark_all_requests_read(caller.store(), &caller.identity).await?;
        Ok(MarkedRead { marked })
    }
    .await;

    render_result(res, StatusCode::OK, result);
}

#[handler]
async fn get_request(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let result: AppResult<PlacementRequest> = async {
        let caller = Caller::from_depot(depot)?;
        let id = int_param(req, "id")?;
        Ok(ledger::get_request(caller.store(), &caller.identity, id).await?)
    }
    .await;

    render_result(res, StatusCode::OK, result);
}

/// ## Summary
/// PUT /api/requests/{id} - Replaces the patient fields of a pending request.
#[handler]
async fn update_request(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let result: AppResult<PlacementRequest> = async {
        let caller = Caller::from_depot(depot)?;
        let id = int_param(req, "id")?;
        let patient: PatientFields = json_body(req).await?;
        Ok(ledger::update_request(caller.store(), &caller.identity, id, &patient).await?)
    }
    .await;

    render_result(res, StatusCode::OK, result);
}

/// ## Summary
/// DELETE /api/requests/{id} - Withdraws a pending request.
#[handler]
async fn cancel_request(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let result: AppResult<()> = async {
        let caller = Caller::from_depot(depot)?;
        let id = int_param(req, "id")?;
        Ok(ledger::cancel_request(caller.store(), &caller.identity, id).await?)
    }
    .await;

    render_empty(res, result);
}

/// ## Summary
/// POST /api/requests/{id}/accept - Accepts a request and opens its room.
///
/// Responds 201 when the room was created by this call and 200 when the
/// request had already been accepted.
#[handler]
async fn accept_request(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let result: AppResult<ledger::AcceptOutcome> = async {
        let caller = Caller::from_depot(depot)?;
        let id = int_param(req, "id")?;
        Ok(ledger::accept_request(caller.store(), &caller.identity, id).await?)
    }
    .await;

    match result {
        Ok(outcome) => {
            let status = if outcome.created {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            render_result(res, status, Ok(outcome));
        }
        Err(err) => render_error(res, &err),
    }
}

#[handler]
async fn reject_request(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let result: AppResult<PlacementRequest> = async {
        let caller = Caller::from_depot(depot)?;
        let id = int_param(req, "id")?;
        Ok(ledger::reject_request(caller.store(), &caller.identity, id).await?)
    }
    .await;

    render_result(res, StatusCode::OK, result);
}

#[handler]
async fn mark_read(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let result: AppResult<()> = async {
        let caller = Caller::from_depot(depot)?;
        let id = int_param(req, "id")?;
        Ok(activity::mark_request_read(caller.store(), &caller.identity, id).await?)
    }
    .await;

    render_empty(res, result);
}

/// ## Summary
/// GET /api/requests/{id}/room - The negotiation room opened for a request.
///
/// ## Errors
/// 404 if the request has not been accepted.
#[handler]
async fn request_room(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let result: AppResult<MessageRoom> = async {
        let caller = Caller::from_depot(depot)?;
        let id = int_param(req, "id")?;
        ledger::room_for_request(caller.store(), &caller.identity, id)
            .await?
            .ok_or_else(|| AppError::from(ServiceError::NotFound(format!("room for request {id}"))))
    }
    .await;

    render_result(res, StatusCode::OK, result);
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path(REQUESTS_ROUTE_COMPONENT)
        .get(list_requests)
        .post(create_request)
        .push(Router::with_path("read-all").post(mark_all_read))
        .push(
            Router::with_path("{id}")
                .get(get_request)
                .put(update_request)
                .delete(cancel_request)
                .push(Router::with_path("accept").post(accept_request))
                .push(Router::with_path("reject").post(reject_request))
                .push(Router::with_path("read").post(mark_read))
                .push(Router::with_path("room").get(request_room)),
        )
}
