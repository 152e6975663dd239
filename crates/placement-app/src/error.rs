use salvo::http::StatusCode;
use salvo::writing::Json;
use serde::Serialize;
use thiserror::Error;

use placement_service::error::ServiceError;

/// Application-level errors (HTTP layer)
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    ServiceError(#[from] ServiceError),

    #[error(transparent)]
    CoreError(#[from] placement_core::error::CoreError),

    #[error("Authentication required: {0}")]
    Unauthenticated(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

pub type AppResult<T> = std::result::Result<T, AppError>;

/// ## Summary
/// Error response payload
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl AppError {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ServiceError(err) => match err {
                ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
                ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
                ServiceError::InvalidState(_) | ServiceError::Validation(_) => {
                    StatusCode::BAD_REQUEST
                }
                ServiceError::Conflict(_) => StatusCode::CONFLICT,
                ServiceError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                ServiceError::FileStorage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::CoreError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Message safe to return to the caller. Server-side failures are not
    /// described beyond their category.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::ServiceError(ServiceError::Unavailable(_)) => "Storage unavailable".to_string(),
            Self::ServiceError(ServiceError::FileStorage(_)) => "File storage error".to_string(),
            Self::CoreError(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

/// ## Summary
/// Writes `err` as a JSON `{"error": ...}` body with its mapped status.
pub fn render_error(res: &mut salvo::Response, err: &AppError) {
    let status = err.status_code();
    if status.is_server_error() {
        tracing::error!(error = ?err, %status, "Request failed");
    } else {
        tracing::debug!(error = %err, %status, "Request rejected");
    }

    res.status_code(status);
    res.render(Json(ErrorResponse {
        error: err.public_message(),
    }));
}

/// ## Summary
/// Renders a handler outcome: the value as JSON with `status`, or the error.
pub fn render_result<T>(res: &mut salvo::Response, status: StatusCode, result: AppResult<T>)
where
    T: Serialize + Send,
{
    match result {
        Ok(value) => {
            res.status_code(status);
            res.render(Json(value));
        }
        Err(err) => render_error(res, &err),
    }
}

/// ## Summary
/// Renders an outcome without a body as `204 No Content`.
pub fn render_empty(res: &mut salvo::Response, result: AppResult<()>) {
    match result {
        Ok(()) => {
            res.status_code(StatusCode::NO_CONTENT);
        }
        Err(err) => render_error(res, &err),
    }
}
