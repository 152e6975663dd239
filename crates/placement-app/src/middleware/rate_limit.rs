use salvo::Router;
use salvo::rate_limiter::{BasicQuota, FixedGuard, MokaStore, RateLimiter, RemoteIpIssuer};

use crate::config::RateLimitConfig;

/// ## Summary
/// Attaches a fixed-window, per-remote-IP rate limiter to `router` when
/// enabled in `config`.
#[must_use]
pub fn with_rate_limit(router: Router, config: &RateLimitConfig) -> Router {
    if !config.enabled {
        tracing::info!("Rate limiting disabled");
        return router;
    }

    let per_minute = config.requests_per_minute.max(1);
    tracing::info!(requests_per_minute = per_minute, "Rate limiting enabled");

    let limiter = RateLimiter::new(
        FixedGuard::new(),
        MokaStore::<String, FixedGuard>::new(),
        RemoteIpIssuer,
        BasicQuota::per_minute(per_minute),
    );
    router.hoop(limiter)
}
