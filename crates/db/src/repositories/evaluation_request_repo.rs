//! Repository for the `evaluationRequests` collection.
//!
//! New requests are keyed by their batch id, so creating a second request
//! for the same batch fails in the store with
//! [`StoreError::AlreadyExists`]. Lookups still query by the `batchId` field
//! to find requests created under store-assigned ids.

use eggbank_core::evaluation_status::ProcessingStatus;
use eggbank_core::types::{DocId, Timestamp};
use serde_json::{json, Value};

use crate::error::StoreError;
use crate::models::evaluation_request::{
    EvaluationRequest, FrameListItem, NewEvaluationRequest, ReportSummary,
};
use crate::store::{encode, patch, DocumentStore, Filter, EVALUATION_REQUESTS};

/// Typed access to evaluation request records.
pub struct EvaluationRequestRepo;

impl EvaluationRequestRepo {
    /// The request of a batch. If several exist, the one keyed by the batch
    /// id wins, then the oldest.
    pub async fn find_by_batch(
        store: &dyn DocumentStore,
        batch_id: &str,
    ) -> Result<Option<EvaluationRequest>, StoreError> {
        let mut docs = store
            .query(EVALUATION_REQUESTS, Some(Filter::eq("batchId", batch_id)))
            .await?;
        let pos = docs.iter().position(|d| d.id == batch_id).unwrap_or(0);
        if docs.is_empty() {
            return Ok(None);
        }
        docs.swap_remove(pos).decode().map(Some)
    }

    /// Create the request of a batch. Fails with
    /// [`StoreError::AlreadyExists`] if the batch already has one.
    pub async fn create(
        store: &dyn DocumentStore,
        input: &NewEvaluationRequest,
    ) -> Result<DocId, StoreError> {
        store
            .insert(EVALUATION_REQUESTS, &input.batch_id, encode(input)?)
            .await?;
        Ok(input.batch_id.clone())
    }

    pub async fn set_status(
        store: &dyn DocumentStore,
        id: &str,
        status: ProcessingStatus,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let fields = patch(json!({"status": status, "updatedAt": now}));
        store.update(EVALUATION_REQUESTS, id, fields).await
    }

    /// Replace the frame list snapshot and set the status in one write.
    pub async fn set_frame_list(
        store: &dyn DocumentStore,
        id: &str,
        frame_list: &[FrameListItem],
        status: ProcessingStatus,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let fields = patch(json!({
            "frameList": serde_json::to_value(frame_list)?,
            "status": status,
            "updatedAt": now,
        }));
        store.update(EVALUATION_REQUESTS, id, fields).await
    }

    /// Write back per-frame statuses after a batch run without touching the
    /// request status.
    pub async fn update_frame_list(
        store: &dyn DocumentStore,
        id: &str,
        frame_list: &[FrameListItem],
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let fields = patch(json!({
            "frameList": serde_json::to_value(frame_list)?,
            "updatedAt": now,
        }));
        store.update(EVALUATION_REQUESTS, id, fields).await
    }

    /// Reset a request for a new run: `pending`, no frames, no error log.
    pub async fn reset(
        store: &dyn DocumentStore,
        id: &str,
        initiated_by: &str,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let fields = patch(json!({
            "status": ProcessingStatus::Pending,
            "frameList": [],
            "errorLog": Value::Null,
            "initiatedBy": initiated_by,
            "updatedAt": now,
        }));
        store.update(EVALUATION_REQUESTS, id, fields).await
    }

    /// Mark the request failed with an error log entry.
    pub async fn record_failure(
        store: &dyn DocumentStore,
        id: &str,
        error_log: &str,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let fields = patch(json!({
            "status": ProcessingStatus::Failed,
            "errorLog": error_log,
            "updatedAt": now,
        }));
        store.update(EVALUATION_REQUESTS, id, fields).await
    }

    pub async fn set_report_summary(
        store: &dyn DocumentStore,
        id: &str,
        summary: ReportSummary,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let fields = patch(json!({
            "reportSummary": serde_json::to_value(summary)?,
            "updatedAt": now,
        }));
        store.update(EVALUATION_REQUESTS, id, fields).await
    }

    pub async fn delete(store: &dyn DocumentStore, id: &str) -> Result<bool, StoreError> {
        store.delete(EVALUATION_REQUESTS, id).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
