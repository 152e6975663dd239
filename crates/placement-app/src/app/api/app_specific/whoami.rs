use salvo::http::StatusCode;
use salvo::{Depot, Response, Router, handler};
use serde::Serialize;

use crate::app::api::context::Caller;
use crate::error::{AppResult, render_result};
use placement_core::types::Identity;
use placement_db::store::Party;
use placement_service::identity::resolve_party;

#[derive(Debug, Serialize)]
struct WhoAmI {
    #[serde(flatten)]
    identity: Identity,
    /// `None` for administrators.
    party: Option<Party>,
}

/// ## Summary
/// Returns the caller identity and the hospital or facility it acts for.
#[handler]
async fn whoami(depot: &mut Depot, res: &mut Response) {
    let result: AppResult<WhoAmI> = async {
        let caller = Caller::from_depot(depot)?;
        let party = resolve_party(caller.store(), &caller.identity).await?;
        Ok(WhoAmI {
            identity: caller.identity,
            party,
        })
    }
    .await;

    render_result(res, StatusCode::OK, result);
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path("whoami").get(whoami)
}
