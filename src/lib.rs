pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;

#[cfg(test)]
pub mod testing;

use axum::{extract::DefaultBodyLimit, http::HeaderValue, Router};
use std::sync::Arc;
use tower_http::{cors::{AllowOrigin, CorsLayer}, trace::TraceLayer};

use crate::config::AppConfig;
use crate::database::{DocumentStore, StoreError};
use crate::handlers::{qna, root, ResourceRouter};

// Collection names
pub const SCHEDULES: &str = "schedules";
pub const TRANSACTIONS: &str = "transactions";
pub const TASKS: &str = "tasks";
pub const QNA: &str = "qna";

/// Attribute that scopes schedules, transactions and tasks to one user
pub const OWNER_FIELD: &str = "user_email";

/// Compose the full application router over an opened store
pub fn app(store: Arc<dyn DocumentStore>, config: &AppConfig) -> Result<Router, StoreError> {
    let router = Router::new()
        .merge(root::routes(store.clone()))
        .merge(ResourceRouter::new(store.collection(SCHEDULES)?, Some(OWNER_FIELD)).routes("/schedule"))
        .merge(ResourceRouter::new(store.collection(TRANSACTIONS)?, Some(OWNER_FIELD)).routes("/transactions"))
        .merge(ResourceRouter::new(store.collection(TASKS)?, Some(OWNER_FIELD)).routes("/tasks"))
        .merge(qna::routes(store.collection(QNA)?))
        // Global middleware
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes))
        .layer(cors_layer(config));

    if config.api.enable_request_logging {
        Ok(router.layer(TraceLayer::new_for_http()))
    } else {
        Ok(router)
    }
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if config.security.cors_permissive() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::permissive().allow_origin(AllowOrigin::list(origins))
}
