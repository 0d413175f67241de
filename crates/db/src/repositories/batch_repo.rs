//! Repository for the `retrievalBatches` collection.

use eggbank_core::eligibility::{EligibilityAssessment, EligibilityStatus};
use eggbank_core::evaluation_status::ProcessingStatus;
use eggbank_core::types::Timestamp;
use serde_json::{json, Value};

use crate::error::StoreError;
use crate::models::retrieval_batch::{ResultSummary, RetrievalBatch};
use crate::store::{patch, DocumentStore, Fields, RETRIEVAL_BATCHES};

/// Typed access to retrieval batch records.
pub struct BatchRepo;

impl BatchRepo {
    pub async fn find_by_id(
        store: &dyn DocumentStore,
        id: &str,
    ) -> Result<Option<RetrievalBatch>, StoreError> {
        store
            .get(RETRIEVAL_BATCHES, id)
            .await?
            .map(|doc| doc.decode())
            .transpose()
    }

    pub async fn set_status(
        store: &dyn DocumentStore,
        id: &str,
        status: ProcessingStatus,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let fields = patch(json!({"status": status, "updatedAt": now}));
        store.update(RETRIEVAL_BATCHES, id, fields).await
    }

    /// Start a new evaluation run: `processing`, and any earlier approval
    /// decision is discarded.
    pub async fn begin_reevaluation(
        store: &dyn DocumentStore,
        id: &str,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let fields = patch(json!({
            "status": ProcessingStatus::Processing,
            "eligibilityStatus": EligibilityStatus::Pending,
            "approvedBy": Value::Null,
            "approvedAt": Value::Null,
            "updatedAt": now,
        }));
        store.update(RETRIEVAL_BATCHES, id, fields).await
    }

    /// Write recomputed counts and the eligibility suggestion. The approval
    /// status always returns to `pending`.
    pub async fn record_assessment(
        store: &dyn DocumentStore,
        id: &str,
        summary: ResultSummary,
        assessment: Option<EligibilityAssessment>,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let mut fields: Fields = patch(json!({
            "resultSummary": serde_json::to_value(summary)?,
            "eligibilityStatus": EligibilityStatus::Pending,
            "updatedAt": now,
        }));
        if let Some(assessment) = assessment {
            fields.insert(
                "suggestedEligibility".to_string(),
                serde_json::to_value(assessment.suggested)?,
            );
            fields.insert(
                "eligibilityPercentage".to_string(),
                json!(assessment.percentage),
            );
        }
        store.update(RETRIEVAL_BATCHES, id, fields).await
    }

    /// Record a human approval decision.
    pub async fn record_decision(
        store: &dyn DocumentStore,
        id: &str,
        status: EligibilityStatus,
        approved_by: &str,
        notes: Option<&str>,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let mut fields = patch(json!({
            "eligibilityStatus": status,
            "approvedBy": approved_by,
            "approvedAt": now,
            "updatedAt": now,
        }));
        if let Some(notes) = notes {
            fields.insert("notes".to_string(), json!(notes));
        }
        store.update(RETRIEVAL_BATCHES, id, fields).await
    }

    pub async fn delete(store: &dyn DocumentStore, id: &str) -> Result<bool, StoreError> {
        store.delete(RETRIEVAL_BATCHES, id).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
