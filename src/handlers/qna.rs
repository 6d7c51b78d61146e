use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::database::{Collection, Document};
use crate::error::ApiError;
use crate::filter::Filter;

#[derive(Debug, Deserialize)]
pub struct QnaQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub difficulty: Option<String>,
}

impl QnaQuery {
    /// Supplied, non-empty parameters become exact-match conditions.
    /// Absent ones are left out of the filter rather than matched against absence.
    pub fn to_filter(&self) -> Result<Filter, ApiError> {
        Filter::new()
            .eq_opt("type", non_empty(&self.kind))
            .and_then(|f| f.eq_opt("difficulty", non_empty(&self.difficulty)))
            .map_err(|e| ApiError::bad_request(e.to_string()))
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Read-only Q&A surface: `GET /qna?type=&difficulty=`
pub fn routes(collection: Arc<dyn Collection>) -> Router {
    Router::new().route("/qna", get(list)).with_state(collection)
}

/// GET /qna - List Q&A documents by type and/or difficulty
async fn list(
    State(collection): State<Arc<dyn Collection>>,
    Query(query): Query<QnaQuery>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let filter = query.to_filter()?;
    let docs = collection.find(&filter).await?;
    Ok(Json(docs))
}
