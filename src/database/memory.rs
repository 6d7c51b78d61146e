use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use tracing::debug;

use super::document::{self, DeleteResult, Document, DocumentId, InsertOneResult, UpdateResult};
use super::{Collection, DocumentStore, StoreError};
use crate::filter::Filter;

/// In-process store used for development and tests. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Arc<MemoryCollection>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn get_or_create(&self, name: &str) -> Arc<MemoryCollection> {
        // Map access never awaits, so a poisoned lock still holds consistent data
        let mut collections = self.collections.lock().unwrap_or_else(|e| e.into_inner());
        collections
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryCollection::new(name)))
            .clone()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn collection(&self, name: &str) -> Result<Arc<dyn Collection>, StoreError> {
        if name.is_empty() {
            return Err(StoreError::InvalidCollection("Collection name cannot be empty".to_string()));
        }
        Ok(self.get_or_create(name))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn close(&self) {
        debug!("Memory store closed");
    }
}

/// Documents kept in insertion order, bodies stored without `_id`
pub struct MemoryCollection {
    name: String,
    docs: RwLock<Vec<(DocumentId, Document)>>,
}

impl MemoryCollection {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            docs: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Collection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn find(&self, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        let docs = self.docs.read().await;
        Ok(docs
            .iter()
            .filter(|(_, body)| filter.matches(body))
            .map(|(id, body)| document::with_id(*id, body.clone()))
            .collect())
    }

    async fn insert_one(&self, mut doc: Document) -> Result<InsertOneResult, StoreError> {
        document::strip_id(&mut doc);
        let id = DocumentId::generate();
        self.docs.write().await.push((id, doc));
        Ok(InsertOneResult::new(id))
    }

    async fn update_one(&self, id: DocumentId, mut set: Document) -> Result<UpdateResult, StoreError> {
        document::strip_id(&mut set);
        let mut docs = self.docs.write().await;

        let Some((_, body)) = docs.iter_mut().find(|(doc_id, _)| *doc_id == id) else {
            return Ok(UpdateResult::new(0, 0));
        };

        let mut modified = false;
        for (key, value) in set {
            if body.get(&key) != Some(&value) {
                body.insert(key, value);
                modified = true;
            }
        }

        Ok(UpdateResult::new(1, u64::from(modified)))
    }

    async fn delete_one(&self, id: DocumentId) -> Result<DeleteResult, StoreError> {
        let mut docs = self.docs.write().await;
        let before = docs.len();
        docs.retain(|(doc_id, _)| *doc_id != id);
        Ok(DeleteResult::new((before - docs.len()) as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn doc(v: Value) -> Document {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn collections_are_shared_by_name() {
        let store = MemoryStore::new();
        let a = store.collection("tasks").unwrap();
        let b = store.collection("tasks").unwrap();
        a.insert_one(doc(json!({"title": "one"}))).await.unwrap();
        assert_eq!(b.find(&Filter::new()).await.unwrap().len(), 1);
        assert!(store.collection("schedules").unwrap().find(&Filter::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn insert_assigns_fresh_ids() {
        let store = MemoryStore::new();
        let tasks = store.collection("tasks").unwrap();
        let first = tasks.insert_one(doc(json!({"_id": "mine", "title": "a"}))).await.unwrap();
        let second = tasks.insert_one(doc(json!({"title": "b"}))).await.unwrap();
        assert_ne!(first.inserted_id, second.inserted_id);

        let all = tasks.find(&Filter::new()).await.unwrap();
        assert_eq!(all[0]["_id"], json!(first.inserted_id.to_string()));
        assert_eq!(all[1]["_id"], json!(second.inserted_id.to_string()));
    }

    #[tokio::test]
    async fn update_merges_and_reports_modification() {
        let store = MemoryStore::new();
        let schedules = store.collection("schedules").unwrap();
        let ack = schedules
            .insert_one(doc(json!({"subject": "Physics", "day": "Mon"})))
            .await
            .unwrap();

        let result = schedules
            .update_one(ack.inserted_id, doc(json!({"_id": "ignored", "subject": "Math"})))
            .await
            .unwrap();
        assert_eq!(result, UpdateResult::new(1, 1));

        let found = schedules.find(&Filter::new()).await.unwrap();
        assert_eq!(found[0]["subject"], json!("Math"));
        assert_eq!(found[0]["day"], json!("Mon"));
        assert_eq!(found[0]["_id"], json!(ack.inserted_id.to_string()));

        // Same values again: matched but not modified
        let again = schedules
            .update_one(ack.inserted_id, doc(json!({"subject": "Math"})))
            .await
            .unwrap();
        assert_eq!(again, UpdateResult::new(1, 0));
    }

    #[tokio::test]
    async fn update_of_unknown_id_matches_nothing() {
        let store = MemoryStore::new();
        let tasks = store.collection("tasks").unwrap();
        let result = tasks
            .update_one(DocumentId::generate(), doc(json!({"title": "x"})))
            .await
            .unwrap();
        assert_eq!(result.matched_count, 0);
        assert!(tasks.find(&Filter::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_reports_count() {
        let store = MemoryStore::new();
        let tasks = store.collection("tasks").unwrap();
        let ack = tasks.insert_one(doc(json!({"title": "x"}))).await.unwrap();

        assert_eq!(tasks.delete_one(ack.inserted_id).await.unwrap().deleted_count, 1);
        assert_eq!(tasks.delete_one(ack.inserted_id).await.unwrap().deleted_count, 0);
    }

    #[tokio::test]
    async fn find_applies_filter() {
        let store = MemoryStore::new();
        let qna = store.collection("qna").unwrap();
        qna.insert_one(doc(json!({"type": "quiz", "difficulty": "hard"}))).await.unwrap();
        qna.insert_one(doc(json!({"type": "quiz", "difficulty": "easy"}))).await.unwrap();
        qna.insert_one(doc(json!({"type": "mcq", "difficulty": "hard"}))).await.unwrap();

        let filter = Filter::new().eq("type", "quiz").unwrap();
        assert_eq!(qna.find(&filter).await.unwrap().len(), 2);
    }
}
