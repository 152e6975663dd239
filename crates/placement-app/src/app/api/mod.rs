mod app_specific;
mod context;
mod requests;
mod rooms;
mod unread;

#[cfg(test)]
mod test_support;

use salvo::Router;

use crate::middleware::identity::IdentityMiddleware;

// Re-export route constants from core
pub use placement_core::constants::{
    API_ROUTE_COMPONENT, API_ROUTE_PREFIX, REQUESTS_ROUTE_COMPONENT, REQUESTS_ROUTE_PREFIX,
    ROOMS_ROUTE_COMPONENT, ROOMS_ROUTE_PREFIX, UNREAD_ROUTE_COMPONENT,
};

/// ## Summary
/// Constructs the API router. Everything except the health check runs behind
/// [`IdentityMiddleware`].
#[must_use]
pub fn routes() -> Router {
    Router::with_path(API_ROUTE_COMPONENT)
        .push(app_specific::public_routes())
        .push(
            Router::new()
                .hoop(IdentityMiddleware)
                .push(app_specific::routes())
                .push(unread::routes())
                .push(requests::routes())
                .push(rooms::routes()),
        )
}
