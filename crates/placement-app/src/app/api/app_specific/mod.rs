use salvo::Router;

mod healthcheck;
mod whoami;

/// Routes reachable without a caller identity.
#[must_use]
pub fn public_routes() -> Router {
    Router::with_path("app").push(healthcheck::routes())
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path("app").push(whoami::routes())
}
