use crate::session::CurrentUser;
use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use uuid::Uuid;

/// Request logging middleware that adds structured logging for all HTTP requests
pub async fn request_logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let request_id = Uuid::new_v4().to_string();

    let method = req.method().clone();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|mp| mp.as_str().to_owned())
        .unwrap_or_else(|| req.uri().path().to_owned());
    let remote_addr = req
        .extensions()
        .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
        .map(|ci| ci.0.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        remote_addr = %remote_addr,
        "incoming request"
    );

    let response = next.run(req).await;

    let duration = start.elapsed();
    let status = response.status().as_u16();
    // copied onto the response by the session middleware
    let user_id = response
        .extensions()
        .get::<CurrentUser>()
        .map(|c| c.user.id.to_string())
        .unwrap_or_else(|| "-".to_string());

    match status {
        500..=599 => tracing::error!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status = status,
            user_id = %user_id,
            duration_ms = %duration.as_millis(),
            "request completed (server error)"
        ),
        400..=499 => tracing::warn!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status = status,
            user_id = %user_id,
            duration_ms = %duration.as_millis(),
            "request completed (client error)"
        ),
        300..=399 => tracing::info!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status = status,
            user_id = %user_id,
            duration_ms = %duration.as_millis(),
            "request completed (redirect)"
        ),
        _ => tracing::info!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status = status,
            user_id = %user_id,
            duration_ms = %duration.as_millis(),
            "request completed"
        ),
    }

    response
}
