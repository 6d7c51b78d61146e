use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use std::sync::Arc;

use crate::database::DocumentStore;

/// Liveness text served at `/`
pub const LIVENESS_MESSAGE: &str = "Daily Flow Server Site is running";

pub fn routes(store: Arc<dyn DocumentStore>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .with_state(store)
}

/// GET / - Plain-text liveness string
async fn root() -> &'static str {
    LIVENESS_MESSAGE
}

/// GET /health - Liveness plus a store round-trip
async fn health(State(store): State<Arc<dyn DocumentStore>>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "store": store.backend()
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "store": store.backend()
                    }
                })),
            )
        }
    }
}
