use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::config::{DatabaseConfig, StoreBackend};
use crate::filter::FilterError;

use super::memory::MemoryStore;
use super::postgres::PgStore;
use super::DocumentStore;

/// Errors from the document store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Invalid collection: {0}")]
    InvalidCollection(String),

    #[error("Invalid stored document in {collection}: {reason}")]
    InvalidDocument { collection: String, reason: String },

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl From<FilterError> for StoreError {
    fn from(err: FilterError) -> Self {
        match err {
            FilterError::InvalidTableName(name) => StoreError::InvalidCollection(name),
            other => StoreError::QueryError(other.to_string()),
        }
    }
}

/// Open the process-wide store selected by configuration.
/// Called once at boot; the returned handle is injected into every router.
pub async fn open(config: &DatabaseConfig) -> Result<Arc<dyn DocumentStore>, StoreError> {
    match config.backend {
        StoreBackend::Memory => {
            info!("Using in-memory document store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let store = PgStore::connect(config).await?;
            Ok(Arc::new(store))
        }
    }
}

/// Resolve the connection string: DATABASE_URL wins, otherwise compose one from
/// the discrete credential settings.
pub fn connection_url(config: &DatabaseConfig) -> Result<String, StoreError> {
    if let Some(url) = &config.url {
        url::Url::parse(url).map_err(|_| StoreError::InvalidDatabaseUrl)?;
        return Ok(url.clone());
    }

    let user = config.user.as_deref().ok_or(StoreError::ConfigMissing("DB_USER"))?;
    let password = config.password.as_deref().ok_or(StoreError::ConfigMissing("DB_PASS"))?;
    let host = config.host.as_deref().ok_or(StoreError::ConfigMissing("DB_HOST"))?;

    let mut url = url::Url::parse(&format!("postgres://{}", host))
        .map_err(|_| StoreError::InvalidDatabaseUrl)?;
    url.set_username(user).map_err(|_| StoreError::InvalidDatabaseUrl)?;
    url.set_password(Some(password)).map_err(|_| StoreError::InvalidDatabaseUrl)?;
    url.set_path(&format!("/{}", config.name));
    Ok(url.into())
}

/// Strip the password from a connection string so it can be logged
pub fn redact_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("****"));
            }
            url.into()
        }
        Err(_) => "<invalid url>".to_string(),
    }
}
