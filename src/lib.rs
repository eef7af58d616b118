// lib.rs - application modules, shared state and the router
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod session;
pub mod store;
pub mod validators;

use axum::{routing::get, Extension, Router};
use config::AppConfig;
use middleware::rate_limit::RateLimiter;
use std::sync::Arc;
use store::Store;
use tower_http::limit::RequestBodyLimitLayer;

/// Form posts are small; anything larger is rejected before it reaches a handler.
/// Sized for a full-length message of 4-byte characters, percent-encoded.
pub(crate) const MAX_REQUEST_BODY_BYTES: usize = 128 * 1024;

/// Window for counting login and signup submissions per client.
const CREDENTIAL_WINDOW_SECS: u64 = 60;

// AppState holds the storage backend, the runtime configuration and the credential throttle
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: AppConfig,
    pub credential_limiter: RateLimiter,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: AppConfig) -> Self {
        let credential_limiter =
            RateLimiter::new(config.credential_attempts_per_minute, CREDENTIAL_WINDOW_SECS);
        AppState {
            store,
            config,
            credential_limiter,
        }
    }
}

/// Builds the full application with every route and shared layer.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(handlers::auth::auth_routes())
        .merge(handlers::account::account_routes())
        .merge(handlers::messages::message_routes())
        .merge(handlers::admin::admin_routes())
        .route("/api/status", get(handlers::status::api_status))
        .layer(axum::middleware::from_fn(middleware::auth::session_middleware))
        .layer(axum::middleware::from_fn(middleware::logging::request_logging_middleware))
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES))
        .layer(Extension(state))
}
