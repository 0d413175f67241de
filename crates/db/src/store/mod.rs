//! Document store collaborator.
//!
//! An abstract set of collections of JSON records keyed by id. The pipeline
//! relies only on single-record operations and single-field equality
//! queries; anything more selective is filtered by the caller after the
//! fetch.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::StoreError;

mod memory;
mod postgres;

pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;

/// Field map of one record body.
pub type Fields = Map<String, Value>;

// ---------------------------------------------------------------------------
// Collection names
// ---------------------------------------------------------------------------

pub const FRAMES: &str = "frames";
pub const EVALUATION_REQUESTS: &str = "evaluationRequests";
pub const RETRIEVAL_BATCHES: &str = "retrievalBatches";
pub const EGG_RECORDS: &str = "eggRecords";
pub const PATIENTS: &str = "patients";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One stored record.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Fields,
}

impl Document {
    /// Decode the record into a model. The document id is exposed to the
    /// model as an `id` field.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        let mut map = self.data.clone();
        map.insert("id".to_string(), Value::String(self.id.clone()));
        Ok(serde_json::from_value(Value::Object(map))?)
    }
}

/// Single equality clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    fn matches(&self, data: &Fields) -> bool {
        data.get(&self.field) == Some(&self.value)
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Abstract document store.
///
/// Updates are last-write-wins per record; there are no multi-record
/// transactions.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Create a record under a store-assigned id. Returns the id.
    async fn create(&self, collection: &str, data: Fields) -> Result<String, StoreError>;

    /// Create a record under `id`, failing with
    /// [`StoreError::AlreadyExists`] if one is present.
    async fn insert(&self, collection: &str, id: &str, data: Fields) -> Result<(), StoreError>;

    /// Create or fully overwrite the record under `id`.
    async fn set(&self, collection: &str, id: &str, data: Fields) -> Result<(), StoreError>;

    /// Merge top-level fields into an existing record. A `null` value
    /// removes the field. Fails with [`StoreError::NotFound`] if the record
    /// does not exist.
    async fn update(&self, collection: &str, id: &str, patch: Fields) -> Result<(), StoreError>;

    /// Delete a record. Returns `false` if it did not exist.
    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError>;

    /// All records of a collection, optionally restricted by one equality
    /// clause, in creation order.
    async fn query(
        &self,
        collection: &str,
        filter: Option<Filter>,
    ) -> Result<Vec<Document>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Encode a model as a record body. Any `id` field is dropped since the id
/// is the record key, not part of the body.
pub fn encode<T: Serialize>(value: &T) -> Result<Fields, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(mut map) => {
            map.remove("id");
            Ok(map)
        }
        other => Err(StoreError::Serialization(serde::ser::Error::custom(
            format!("expected an object, got {other}"),
        ))),
    }
}

/// Turn a `json!({...})` literal into a patch. Non-objects yield an empty
/// patch.
pub fn patch(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        _ => Fields::new(),
    }
}

/// Apply [`DocumentStore::update`] semantics to an in-memory record body.
pub(crate) fn apply_patch(data: &mut Fields, patch: Fields) {
    for (key, value) in patch {
        if value.is_null() {
            data.remove(&key);
        } else {
            data.insert(key, value);
        }
    }
}

/// Generate a new record id.
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
