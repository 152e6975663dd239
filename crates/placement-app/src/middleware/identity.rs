use salvo::Depot;

use crate::config::{AuthConfig, AuthMethod, SingleUserAuthConfig, get_config_from_depot};
use crate::error::{AppError, AppResult, render_error};
use placement_core::error::CoreError;
use placement_core::types::{Identity, Role};

pub mod depot_keys {
    pub const CALLER_IDENTITY: &str = "__caller_identity";
}

/// ## Summary
/// Middleware that resolves the caller identity and stores it in the depot.
///
/// In `proxy` mode the identity comes from headers set by the upstream
/// authenticator; in `single_user` mode the configured identity is used.
///
/// ## Errors
/// Responds 401 when the identity headers are missing or malformed, 500 when
/// the configuration is unusable.
pub struct IdentityMiddleware;

#[salvo::async_trait]
impl salvo::Handler for IdentityMiddleware {
    #[tracing::instrument(skip(self, req, depot, res, ctrl), fields(
        method = %req.method(),
        path = %req.uri().path()
    ))]
    async fn handle(
        &self,
        req: &mut salvo::Request,
        depot: &mut Depot,
        res: &mut salvo::Response,
        ctrl: &mut salvo::FlowCtrl,
    ) {
        let resolved = get_config_from_depot(depot)
            .and_then(|config| identity_from_request(req, &config.auth));

        match resolved {
            Ok(identity) => {
                tracing::trace!(user_id = identity.user_id, role = %identity.role, "Caller identified");
                depot.insert(depot_keys::CALLER_IDENTITY, identity);
            }
            Err(err) => {
                render_error(res, &err);
                ctrl.skip_rest();
            }
        }
    }
}

/// ## Summary
/// Resolves the caller identity for `req` according to `auth`.
///
/// ## Errors
/// `Unauthenticated` if a proxy header is missing or cannot be parsed;
/// `CoreError` if single-user mode has no configured identity.
pub fn identity_from_request(req: &salvo::Request, auth: &AuthConfig) -> AppResult<Identity> {
    match auth.method {
        AuthMethod::SingleUser => auth
            .single_user
            .as_ref()
            .map(SingleUserAuthConfig::identity)
            .ok_or_else(|| {
                CoreError::ConfigError("auth.single_user must be set in single_user mode".into())
                    .into()
            }),
        AuthMethod::Proxy => {
            let user_header = &auth.proxy.user_id_header;
            let user_id = header_value(req, user_header)?
                .parse::<i32>()
                .map_err(|_err| AppError::Unauthenticated(format!("invalid {user_header} header")))?;

            let role_header = &auth.proxy.role_header;
            let role = header_value(req, role_header)?
                .parse::<Role>()
                .map_err(|_err| AppError::Unauthenticated(format!("invalid {role_header} header")))?;

            Ok(Identity::new(user_id, role))
        }
    }
}

fn header_value<'a>(req: &'a salvo::Request, name: &str) -> AppResult<&'a str> {
    req.headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::Unauthenticated(format!("missing {name} header")))
}

/// ## Summary
/// Retrieves the caller identity stored by [`IdentityMiddleware`].
///
/// ## Errors
/// `Unauthenticated` if the middleware did not run for this request.
pub fn get_identity_from_depot(depot: &Depot) -> AppResult<Identity> {
    depot
        .get::<Identity>(depot_keys::CALLER_IDENTITY)
        .copied()
        .map_err(|_err| AppError::Unauthenticated("no caller identity".into()))
}
