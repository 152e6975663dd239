use std::sync::Arc;

use salvo::async_trait;

use crate::error::AppResult;
use placement_core::error::CoreError;
use placement_db::store::PlacementStore;
use placement_service::storage::FileStorage;

/// Injects the placement store into every request's depot.
pub struct StoreHandler {
    pub store: Arc<dyn PlacementStore>,
}

#[async_trait]
impl salvo::Handler for StoreHandler {
    #[tracing::instrument(skip(self, _req, depot, _res, _ctrl))]
    async fn handle(
        &self,
        _req: &mut salvo::Request,
        depot: &mut salvo::Depot,
        _res: &mut salvo::Response,
        _ctrl: &mut salvo::FlowCtrl,
    ) {
        depot.inject(Arc::clone(&self.store));
    }
}

/// ## Summary
/// Retrieves the placement store from the depot.
///
/// ## Errors
/// Returns an error if no store was injected.
pub fn get_store_from_depot(depot: &salvo::Depot) -> AppResult<Arc<dyn PlacementStore>> {
    depot
        .obtain::<Arc<dyn PlacementStore>>()
        .cloned()
        .map_err(|_err| CoreError::InvariantViolation("Placement store not found in depot").into())
}

/// Injects the room file storage into every request's depot.
pub struct FileStorageHandler {
    pub files: Arc<dyn FileStorage>,
}

#[async_trait]
impl salvo::Handler for FileStorageHandler {
    #[tracing::instrument(skip(self, _req, depot, _res, _ctrl))]
    async fn handle(
        &self,
        _req: &mut salvo::Request,
        depot: &mut salvo::Depot,
        _res: &mut salvo::Response,
        _ctrl: &mut salvo::FlowCtrl,
    ) {
        depot.inject(Arc::clone(&self.files));
    }
}

/// ## Summary
/// Retrieves the file storage from the depot.
///
/// ## Errors
/// Returns an error if no file storage was injected.
pub fn get_files_from_depot(depot: &salvo::Depot) -> AppResult<Arc<dyn FileStorage>> {
    depot
        .obtain::<Arc<dyn FileStorage>>()
        .cloned()
        .map_err(|_err| CoreError::InvariantViolation("File storage not found in depot").into())
}
