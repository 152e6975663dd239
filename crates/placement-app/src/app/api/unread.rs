use salvo::http::StatusCode;
use salvo::{Depot, Response, Router, handler};

use super::context::Caller;
use crate::error::{AppResult, render_result};
use placement_core::constants::UNREAD_ROUTE_COMPONENT;
use placement_service::activity::{self, UnreadCounts};

/// ## Summary
/// GET /api/unread - Rooms with unseen activity and requests awaiting the
/// caller's attention.
#[handler]
async fn unread_counts(depot: &mut Depot, res: &mut Response) {
    let result: AppResult<UnreadCounts> = async {
        let caller = Caller::from_depot(depot)?;
        Ok(activity::unread_counts(caller.store(), &caller.identity).await?)
    }
    .await;

    render_result(res, StatusCode::OK, result);
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path(UNREAD_ROUTE_COMPONENT).get(unread_counts)
}
