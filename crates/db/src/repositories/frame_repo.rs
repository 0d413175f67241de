//! Repository for the `frames` collection.

use eggbank_core::types::{DocId, Timestamp};
use serde_json::{json, Value};

use crate::error::StoreError;
use crate::models::frame::{DetectionResults, EvaluationResult, Frame, NewFrame};
use crate::store::{encode, patch, DocumentStore, Filter, FRAMES};

/// Typed access to frame records.
pub struct FrameRepo;

impl FrameRepo {
    pub async fn find_by_id(
        store: &dyn DocumentStore,
        id: &str,
    ) -> Result<Option<Frame>, StoreError> {
        store.get(FRAMES, id).await?.map(|doc| doc.decode()).transpose()
    }

    /// All frames of a batch in upload order.
    pub async fn list_by_batch(
        store: &dyn DocumentStore,
        batch_id: &str,
    ) -> Result<Vec<Frame>, StoreError> {
        store
            .query(FRAMES, Some(Filter::eq("batchId", batch_id)))
            .await?
            .iter()
            .map(|doc| doc.decode())
            .collect()
    }

    pub async fn create(store: &dyn DocumentStore, input: &NewFrame) -> Result<DocId, StoreError> {
        store.create(FRAMES, encode(input)?).await
    }

    /// Create a frame under a caller-chosen id (the upload path names the
    /// blob after the frame before the record exists).
    pub async fn insert(
        store: &dyn DocumentStore,
        id: &str,
        input: &NewFrame,
    ) -> Result<(), StoreError> {
        store.insert(FRAMES, id, encode(input)?).await
    }

    /// Write the results of a successful processing attempt and clear any
    /// earlier error.
    pub async fn record_success(
        store: &dyn DocumentStore,
        id: &str,
        detections: &DetectionResults,
        evaluation: &EvaluationResult,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let fields = patch(json!({
            "detectionResults": serde_json::to_value(detections)?,
            "evaluationResult": serde_json::to_value(evaluation)?,
            "error": Value::Null,
            "updatedAt": now,
        }));
        store.update(FRAMES, id, fields).await
    }

    /// Record a failed processing attempt. Results of earlier attempts are
    /// removed so a frame never shows both an error and an evaluation.
    pub async fn record_failure(
        store: &dyn DocumentStore,
        id: &str,
        error: &str,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let fields = patch(json!({
            "error": error,
            "detectionResults": Value::Null,
            "evaluationResult": Value::Null,
            "updatedAt": now,
        }));
        store.update(FRAMES, id, fields).await
    }

    pub async fn delete(store: &dyn DocumentStore, id: &str) -> Result<bool, StoreError> {
        store.delete(FRAMES, id).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
