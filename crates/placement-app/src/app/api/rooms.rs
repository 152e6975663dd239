//! `/api/rooms`: negotiation rooms, their conversation and attachments.

use salvo::http::StatusCode;
use salvo::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use salvo::{Depot, Request, Response, Router, handler};
use serde::Deserialize;

use super::context::{Caller, int_param, json_body, uuid_param};
use crate::error::{AppError, AppResult, render_empty, render_error, render_result};
use crate::store_handler::get_files_from_depot;
use placement_core::constants::ROOMS_ROUTE_COMPONENT;
use placement_db::model::message::Message;
use placement_db::model::room::MessageRoom;
use placement_db::model::room_file::RoomFile;
use placement_db::store::RoomSummary;
use placement_service::error::ServiceError;
use placement_service::room::RoomDetail;
use placement_service::storage::StorageError;
use placement_service::{activity, conversation, room};

/// Multipart field carrying an uploaded attachment.
const FILE_FIELD: &str = "file";

/// ## Summary
/// Post message request payload
#[derive(Debug, Deserialize)]
pub struct PostMessageBody {
    pub text: String,
}

#[handler]
async fn list_rooms(depot: &mut Depot, res: &mut Response) {
    let result: AppResult<Vec<RoomSummary>> = async {
        let caller = Caller::from_depot(depot)?;
        Ok(room::list_rooms(caller.store(), &caller.identity).await?)
    }
    .await;

    render_result(res, StatusCode::OK, result);
}

/// ## Summary
/// GET /api/rooms/{id} - The room with its messages and files.
#[handler]
async fn room_detail(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let result: AppResult<RoomDetail> = async {
        let caller = Caller::from_depot(depot)?;
        let id = uuid_param(req, "id")?;
        Ok(room::room_detail(caller.store(), &caller.identity, id).await?)
    }
    .await;

    render_result(res, StatusCode::OK, result);
}

/// The room transitions exposed as `POST /api/rooms/{id}/<action>`.
#[derive(Debug, Clone, Copy)]
enum RoomAction {
    Accept,
    Reject,
    Complete,
    CancelCompletion,
}

async fn apply_room_action(
    req: &Request,
    depot: &Depot,
    action: RoomAction,
) -> AppResult<MessageRoom> {
    let caller = Caller::from_depot(depot)?;
    let id = uuid_param(req, "id")?;
    let (store, identity) = (caller.store(), &caller.identity);

    let updated = match action {
        RoomAction::Accept => room::accept_room(store, identity, id).await?,
        RoomAction::Reject => room::reject_room(store, identity, id).await?,
        RoomAction::Complete => room::mark_complete(store, identity, id).await?,
        RoomAction::CancelCompletion => room::cancel_completion(store, identity, id).await?,
    };
    Ok(updated)
}

#[handler]
async fn accept_room(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let result = apply_room_action(req, depot, RoomAction::Accept).await;
    render_result(res, StatusCode::OK, result);
}

#[handler]
async fn reject_room(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let result = apply_room_action(req, depot, RoomAction::Reject).await;
    render_result(res, StatusCode::OK, result);
}

#[handler]
async fn complete_room(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let result = apply_room_action(req, depot, RoomAction::Complete).await;
    render_result(res, StatusCode::OK, result);
}

#[handler]
async fn cancel_completion(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let result = apply_room_action(req, depot, RoomAction::CancelCompletion).await;
    render_result(res, StatusCode::OK, result);
}

#[handler]
async fn mark_read(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let result: AppResult<()> = async {
        let caller = Caller::from_depot(depot)?;
        let id = uuid_param(req, "id")?;
        Ok(activity::mark_room_read(caller.store(), &caller.identity, id).await?)
    }
    .await;

    render_empty(res, result);
}

#[handler]
async fn list_messages(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let result: AppResult<Vec<Message>> = async {
        let caller = Caller::from_depot(depot)?;
        let id = uuid_param(req, "id")?;
        Ok(conversation::list_messages(caller.store(), &caller.identity, id).await?)
    }
    .await;

    render_result(res, StatusCode::OK, result);
}

/// ## Summary
/// POST /api/rooms/{id}/messages - Appends a message from the caller.
#[handler]
async fn post_message(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let result: AppResult<Message> = async {
        let caller = Caller::from_depot(depot)?;
        let id = uuid_param(req, "id")?;
        let body: PostMessageBody = json_body(req).await?;
        Ok(conversation::post_message(caller.store(), &caller.identity, id, &body.text).await?)
    }
    .await;

    render_result(res, StatusCode::CREATED, result);
}

#[handler]
async fn list_files(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let result: AppResult<Vec<RoomFile>> = async {
        let caller = Caller::from_depot(depot)?;
        let id = uuid_param(req, "id")?;
        Ok(conversation::list_files(caller.store(), &caller.identity, id).await?)
    }
    .await;

    render_result(res, StatusCode::OK, result);
}

/// ## Summary
/// POST /api/rooms/{id}/files - Uploads the multipart `file` field as a room
/// attachment.
///
/// ## Errors
/// 400 when the field is missing or the room no longer accepts files.
#[handler]
async fn upload_file(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let result: AppResult<RoomFile> = async {
        let caller = Caller::from_depot(depot)?;
        let files = get_files_from_depot(depot)?;
        let id = uuid_param(req, "id")?;

        let (file_name, temp_path) = match req.file(FILE_FIELD).await {
            Some(part) => (
                part.name().unwrap_or_default().to_string(),
                part.path().clone(),
            ),
            None => {
                return Err(AppError::BadRequest(format!(
                    "multipart field '{FILE_FIELD}' is required"
                )));
            }
        };
        let bytes = tokio::fs::read(&temp_path)
            .await
            .map_err(|err| ServiceError::from(StorageError::from(err)))?;

        Ok(conversation::upload_file(
            caller.store(),
            files.as_ref(),
            &caller.identity,
            id,
            &file_name,
            bytes,
        )
        .await?)
    }
    .await;

    render_result(res, StatusCode::CREATED, result);
}

/// ## Summary
/// GET /api/rooms/{id}/files/{file_id} - Streams a room attachment.
#[handler]
async fn download_file(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let result: AppResult<(RoomFile, Vec<u8>)> = async {
        let caller = Caller::from_depot(depot)?;
        let files = get_files_from_depot(depot)?;
        let id = uuid_param(req, "id")?;
        let file_id = int_param(req, "file_id")?;
        Ok(
            conversation::open_file(caller.store(), files.as_ref(), &caller.identity, id, file_id)
                .await?,
        )
    }
    .await;

    let (file, bytes) = match result {
        Ok(found) => found,
        Err(err) => {
            render_error(res, &err);
            return;
        }
    };

    let disposition = format!(
        "attachment; filename=\"{}\"",
        file.file_name.replace(['"', '\\'], "_")
    );
    if res
        .add_header(CONTENT_TYPE, "application/octet-stream", true)
        .is_err()
        || res.add_header(CONTENT_DISPOSITION, disposition, true).is_err()
    {
        tracing::warn!(file_id = file.id, "Failed to set download headers");
    }

    res.status_code(StatusCode::OK);
    if let Err(err) = res.write_body(bytes) {
        tracing::error!(error = ?err, file_id = file.id, "Failed to write file body");
        res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
    }
}

/// ## Summary
/// DELETE /api/rooms/{id}/files/{file_id} - Removes an attachment the caller
/// uploaded.
#[handler]
async fn delete_file(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let result: AppResult<()> = async {
        let caller = Caller::from_depot(depot)?;
        let files = get_files_from_depot(depot)?;
        let id = uuid_param(req, "id")?;
        let file_id = int_param(req, "file_id")?;
        Ok(
            conversation::delete_file(caller.store(), files.as_ref(), &caller.identity, id, file_id)
                .await?,
        )
    }
    .await;

    render_empty(res, result);
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path(ROOMS_ROUTE_COMPONENT).get(list_rooms).push(
        Router::with_path("{id}")
            .get(room_detail)
            .push(
                Router::with_path("messages")
                    .get(list_messages)
                    .post(post_message),
            )
            .push(
                Router::with_path("files")
                    .get(list_files)
                    .post(upload_file)
                    .push(
                        Router::with_path("{file_id}")
                            .get(download_file)
                            .delete(delete_file),
                    ),
            )
            .push(Router::with_path("accept").post(accept_room))
            .push(Router::with_path("reject").post(reject_room))
            .push(Router::with_path("complete").post(complete_room))
            .push(Router::with_path("cancel-completion").post(cancel_completion))
            .push(Router::with_path("read").post(mark_read)),
    )
}
