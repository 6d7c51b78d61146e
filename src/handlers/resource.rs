use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use crate::database::{Collection, DeleteResult, Document, DocumentId, InsertOneResult, UpdateResult};
use crate::error::ApiError;
use crate::filter::Filter;

/// Query string accepted by list endpoints
#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    /// Owner identifier (the user's email)
    pub email: Option<String>,
}

/// CRUD surface over one collection, optionally scoped by an owner attribute.
///
/// Mounting produces four handlers:
/// - `GET    /<path>?email=`  list documents owned by `email`
/// - `POST   /<path>`         insert, 201 with the insertion acknowledgement
/// - `PUT    /<path>/:id`     merge-set attributes, 404 when nothing matched
/// - `DELETE /<path>/:id`     delete, 404 when nothing was deleted
#[derive(Clone)]
pub struct ResourceRouter {
    collection: Arc<dyn Collection>,
    owner_field: Option<&'static str>,
}

impl ResourceRouter {
    pub fn new(collection: Arc<dyn Collection>, owner_field: Option<&'static str>) -> Self {
        Self { collection, owner_field }
    }

    /// Mount the four handlers under `path` (e.g. "/tasks")
    pub fn routes(self, path: &str) -> Router {
        Router::new()
            .route(path, get(list).post(create))
            .route(&format!("{}/:id", path), put(update).delete(delete))
            .with_state(self)
    }

    /// Build the list filter. `None` means the request can match nothing:
    /// owner-scoped resources require an explicit, non-empty owner value.
    fn list_filter(&self, owner: Option<&str>) -> Result<Option<Filter>, ApiError> {
        let Some(field) = self.owner_field else {
            return Ok(Some(Filter::new()));
        };

        match owner.map(str::trim).filter(|o| !o.is_empty()) {
            Some(owner) => Filter::new()
                .eq(field, owner)
                .map(Some)
                .map_err(|e| ApiError::bad_request(e.to_string())),
            None => Ok(None),
        }
    }
}

/// GET /<path>?email= - List documents for one owner
async fn list(
    State(resource): State<ResourceRouter>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let Some(filter) = resource.list_filter(query.email.as_deref())? else {
        debug!("List on {} without owner; returning no documents", resource.collection.name());
        return Ok(Json(vec![]));
    };

    let docs = resource.collection.find(&filter).await?;
    Ok(Json(docs))
}

/// POST /<path> - Insert a new document
async fn create(
    State(resource): State<ResourceRouter>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<InsertOneResult>), ApiError> {
    let doc = object_payload(payload)?;

    let result = resource.collection.insert_one(doc).await?;
    info!("Inserted {} into {}", result.inserted_id, resource.collection.name());

    Ok((StatusCode::CREATED, Json(result)))
}

/// PUT /<path>/:id - Merge attributes onto an existing document
async fn update(
    State(resource): State<ResourceRouter>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<UpdateResult>, ApiError> {
    let id = DocumentId::parse(&id)?;
    let set = object_payload(payload)?;

    let result = resource.collection.update_one(id, set).await?;
    if result.matched_count == 0 {
        return Err(ApiError::not_found("not found"));
    }

    info!(
        "Updated {} in {} (modified: {})",
        id,
        resource.collection.name(),
        result.modified_count
    );
    Ok(Json(result))
}

/// DELETE /<path>/:id - Remove a document
async fn delete(
    State(resource): State<ResourceRouter>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResult>, ApiError> {
    let id = DocumentId::parse(&id)?;

    let result = resource.collection.delete_one(id).await?;
    if result.deleted_count == 0 {
        return Err(ApiError::not_found("not found"));
    }

    info!("Deleted {} from {}", id, resource.collection.name());
    Ok(Json(result))
}

/// Unwrap a JSON body that must be an object. `_id` is left for the store to strip.
fn object_payload(payload: Result<Json<Value>, JsonRejection>) -> Result<Document, ApiError> {
    let Json(value) = payload?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ApiError::bad_request("request body must be a JSON object")),
    }
}
