use thiserror::Error;

use crate::storage::StorageError;

/// Service layer errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(#[from] placement_db::error::DbError),

    #[error("File storage error: {0}")]
    FileStorage(#[from] StorageError),
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
