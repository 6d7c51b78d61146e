pub mod document;
pub mod manager;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use std::sync::Arc;

use crate::filter::Filter;

pub use document::{
    DeleteResult, Document, DocumentId, IdError, InsertOneResult, UpdateResult, ID_FIELD,
};
pub use manager::{open, StoreError};
pub use memory::MemoryStore;
pub use postgres::PgStore;

/// A named document collection: filter-based find plus single-document writes
/// addressed by store-generated identifier.
#[async_trait]
pub trait Collection: Send + Sync {
    fn name(&self) -> &str;

    /// All documents matching `filter`, each carrying its `_id`
    async fn find(&self, filter: &Filter) -> Result<Vec<Document>, StoreError>;

    /// Store `doc` under a freshly generated identifier. Any `_id` in `doc` is discarded.
    async fn insert_one(&self, doc: Document) -> Result<InsertOneResult, StoreError>;

    /// Merge `set` onto the document at `id`: named attributes are overwritten,
    /// the rest are preserved. Never creates a document.
    async fn update_one(&self, id: DocumentId, set: Document) -> Result<UpdateResult, StoreError>;

    async fn delete_one(&self, id: DocumentId) -> Result<DeleteResult, StoreError>;
}

/// Process-wide store handle. Opened once at boot, closed after shutdown.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short backend name for logs and health output
    fn backend(&self) -> &'static str;

    fn collection(&self, name: &str) -> Result<Arc<dyn Collection>, StoreError>;

    /// Round-trip to the backend to confirm connectivity
    async fn ping(&self) -> Result<(), StoreError>;

    async fn close(&self);
}
