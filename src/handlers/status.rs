use crate::AppState;
use axum::{extract::Extension, response::Json};
use serde_json::json;
use std::sync::Arc;

// API Status endpoint
pub async fn api_status(Extension(state): Extension<Arc<AppState>>) -> Json<serde_json::Value> {
    let store_status = match state.store.ping().await {
        Ok(_) => "healthy",
        Err(e) => {
            tracing::warn!("Store health check failed: {}", e);
            "unhealthy"
        }
    };

    Json(json!({
        "status": "operational",
        "version": env!("CARGO_PKG_VERSION"),
        "services": {
            "store": {
                "backend": state.store.backend_name(),
                "status": store_status
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use crate::test_support::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_status_reports_store_health() {
        let state = test_state();
        let response = send(&state, get("/api/status", None)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["status"], "operational");
        assert_eq!(body["services"]["store"]["backend"], "memory");
        assert_eq!(body["services"]["store"]["status"], "healthy");
    }
}
