//! Route definitions and router assembly

mod auth;

use axum::{
    http::{HeaderValue, Method},
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::handlers;
use crate::middleware::{self, RateLimiter};
use crate::state::AppState;

pub use auth::auth_routes;

/// Router options that vary by deployment
#[derive(Debug, Clone, Default)]
pub struct RouterOptions {
    /// Comma separated CORS origins; permissive when unset
    pub cors_allowed_origins: Option<String>,
    /// Add the HSTS header
    pub hsts: bool,
}

/// Build the full application router with its middleware stack
pub fn build_router(state: AppState, rate_limiter: RateLimiter, options: RouterOptions) -> Router {
    let mut router = Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .merge(auth_routes())
        .with_state(state)
        .layer(axum::middleware::from_fn(middleware::security_headers));

    if options.hsts {
        router = router.layer(axum::middleware::from_fn(middleware::hsts_header));
    }

    router
        .layer(axum::middleware::from_fn(middleware::request_tracing))
        .layer(axum::middleware::from_fn(move |req, next| {
            let limiter = rate_limiter.clone();
            middleware::rate_limit_layer(limiter)(req, next)
        }))
        .layer(configure_cors(options.cors_allowed_origins.as_deref()))
}

fn configure_cors(allowed_origins: Option<&str>) -> CorsLayer {
    let allowed_origins = allowed_origins.unwrap_or_default();

    if allowed_origins.is_empty() {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (permissive)");
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}
