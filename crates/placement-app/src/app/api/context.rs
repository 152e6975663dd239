use std::sync::Arc;

use salvo::{Depot, Request};
use serde::de::DeserializeOwned;

use crate::error::{AppError, AppResult};
use crate::middleware::identity::get_identity_from_depot;
use crate::store_handler::get_store_from_depot;
use placement_core::types::Identity;
use placement_db::store::PlacementStore;

/// The identified caller together with the store their request runs against.
pub struct Caller {
    pub store: Arc<dyn PlacementStore>,
    pub identity: Identity,
}

impl Caller {
    /// ## Errors
    /// Fails if the identity middleware or store handler did not run.
    pub fn from_depot(depot: &Depot) -> AppResult<Self> {
        Ok(Self {
            identity: get_identity_from_depot(depot)?,
            store: get_store_from_depot(depot)?,
        })
    }

    pub fn store(&self) -> &dyn PlacementStore {
        self.store.as_ref()
    }
}

fn raw_param<'a>(req: &'a Request, name: &str) -> AppResult<&'a str> {
    req.params()
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| AppError::BadRequest(format!("missing path parameter {name}")))
}

/// ## Errors
/// `BadRequest` if the parameter is absent or not an integer.
pub fn int_param(req: &Request, name: &str) -> AppResult<i32> {
    let raw = raw_param(req, name)?;
    raw.parse()
        .map_err(|_err| AppError::BadRequest(format!("{name} must be an integer, got '{raw}'")))
}

/// ## Errors
/// `BadRequest` if the parameter is absent or not a UUID.
pub fn uuid_param(req: &Request, name: &str) -> AppResult<uuid::Uuid> {
    let raw = raw_param(req, name)?;
    raw.parse()
        .map_err(|_err| AppError::BadRequest(format!("{name} must be a UUID, got '{raw}'")))
}

/// ## Errors
/// `BadRequest` if the body is not valid JSON for `T`.
pub async fn json_body<T: DeserializeOwned>(req: &mut Request) -> AppResult<T> {
    req.parse_json::<T>().await.map_err(|err| {
        tracing::debug!(error = ?err, "Rejected request body");
        AppError::BadRequest("Invalid request body".to_string())
    })
}
