//! In-memory [`DocumentStore`] used by tests and single-process development.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{apply_patch, new_id, Document, DocumentStore, Fields, Filter};
use crate::error::StoreError;

/// Records of one collection in insertion order.
#[derive(Default)]
struct Collection {
    order: Vec<String>,
    records: HashMap<String, Fields>,
}

impl Collection {
    fn put(&mut self, id: &str, data: Fields) {
        if self.records.insert(id.to_string(), data).is_none() {
            self.order.push(id.to_string());
        }
    }
}

/// Process-local document store backed by a `RwLock`ed map.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records in a collection.
    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, |c| c.records.len())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|c| c.records.get(id))
            .map(|data| Document {
                id: id.to_string(),
                data: data.clone(),
            }))
    }

    async fn create(&self, collection: &str, data: Fields) -> Result<String, StoreError> {
        let id = new_id();
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .put(&id, data);
        Ok(id)
    }

    async fn insert(&self, collection: &str, id: &str, data: Fields) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let coll = collections.entry(collection.to_string()).or_default();
        if coll.records.contains_key(id) {
            return Err(StoreError::AlreadyExists {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        coll.put(id, data);
        Ok(())
    }

    async fn set(&self, collection: &str, id: &str, data: Fields) -> Result<(), StoreError> {
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .put(id, data);
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, patch: Fields) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let record = collections
            .get_mut(collection)
            .and_then(|c| c.records.get_mut(id))
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        apply_patch(record, patch);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(coll) = collections.get_mut(collection) else {
            return Ok(false);
        };
        let existed = coll.records.remove(id).is_some();
        if existed {
            coll.order.retain(|k| k != id);
        }
        Ok(existed)
    }

    async fn query(
        &self,
        collection: &str,
        filter: Option<Filter>,
    ) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().await;
        let Some(coll) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(coll
            .order
            .iter()
            .filter_map(|id| coll.records.get(id).map(|data| (id, data)))
            .filter(|(_, data)| filter.as_ref().is_none_or(|f| f.matches(data)))
            .map(|(id, data)| Document {
                id: id.clone(),
                data: data.clone(),
            })
            .collect())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
