use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use crate::database::{
    Collection, DeleteResult, Document, DocumentId, InsertOneResult, StoreError, UpdateResult,
};
use crate::filter::Filter;

/// Detail carried by every `FailingCollection` error; must never reach a client
pub const FAULT_DETAIL: &str = "connection reset by peer while reading from \"secret_host\"";

/// A collection whose every operation fails with a store fault
pub struct FailingCollection;

fn fault() -> StoreError {
    StoreError::QueryError(FAULT_DETAIL.to_string())
}

#[async_trait]
impl Collection for FailingCollection {
    fn name(&self) -> &str {
        "failing"
    }

    async fn find(&self, _filter: &Filter) -> Result<Vec<Document>, StoreError> {
        Err(fault())
    }

    async fn insert_one(&self, _doc: Document) -> Result<InsertOneResult, StoreError> {
        Err(fault())
    }

    async fn update_one(&self, _id: DocumentId, _set: Document) -> Result<UpdateResult, StoreError> {
        Err(fault())
    }

    async fn delete_one(&self, _id: DocumentId) -> Result<DeleteResult, StoreError> {
        Err(fault())
    }
}

/// Drive one request through a router and decode the JSON body (Null when not JSON)
pub async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            builder = builder.header("content-type", "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

/// Assert a response is the generic 500 with no internal detail
pub fn assert_generic_store_fault(status: StatusCode, body: &Value) {
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "body: {}", body);
    assert_eq!(body["code"], "INTERNAL_SERVER_ERROR");
    assert_eq!(body["message"], "An error occurred while processing your request");
    assert!(!body.to_string().contains("secret_host"), "fault detail leaked: {}", body);
}
