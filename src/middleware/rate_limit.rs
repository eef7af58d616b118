use crate::handlers::ui;
use crate::AppState;
use axum::{
    extract::{ConnectInfo, Extension, Request},
    http::{Method, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Fixed-window counter keyed by client address.
#[derive(Clone)]
pub struct RateLimiter {
    // Store IP -> (request_count, window_start)
    clients: Arc<Mutex<HashMap<String, (u32, Instant)>>>,
    max_requests: u32,
    window_duration: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window_seconds: u64) -> Self {
        Self {
            clients: Arc::new(Mutex::new(HashMap::new())),
            max_requests,
            window_duration: Duration::from_secs(window_seconds),
        }
    }

    pub fn check_rate_limit(&self, client_ip: &str) -> bool {
        let mut clients = self.clients.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let now = Instant::now();

        match clients.get_mut(client_ip) {
            Some((count, window_start)) => {
                // Check if window has expired
                if now.duration_since(*window_start) > self.window_duration {
                    *count = 1;
                    *window_start = now;
                    true
                } else if *count >= self.max_requests {
                    false
                } else {
                    *count += 1;
                    true
                }
            }
            None => {
                clients.insert(client_ip.to_string(), (1, now));
                true
            }
        }
    }

    // Clean up old entries periodically
    pub fn cleanup_expired(&self) {
        let mut clients = self.clients.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let now = Instant::now();

        clients.retain(|_, (_, window_start)| {
            now.duration_since(*window_start) <= self.window_duration
        });
    }
}

/// Throttles credential submissions (login and signup posts) per client IP.
/// Page loads are never counted.
pub async fn credential_rate_limit_middleware(
    Extension(state): Extension<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() != Method::POST {
        return next.run(request).await;
    }

    let client_ip = connect_info
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    if !state.credential_limiter.check_rate_limit(&client_ip) {
        tracing::warn!("Credential rate limit exceeded for IP: {}", client_ip);
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Html(ui::error_page(
                "Too Many Attempts",
                "Too many attempts. Please wait a minute and try again.",
            )),
        )
            .into_response();
    }

    // Occasionally clean up expired entries
    if rand::random::<u8>() < 10 {
        state.credential_limiter.cleanup_expired();
    }

    next.run(request).await
}
