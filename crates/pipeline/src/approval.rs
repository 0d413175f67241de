//! Human approval of a batch's eligibility suggestion.

use std::sync::Arc;

use chrono::Utc;
use eggbank_core::eligibility::EligibilityStatus;
use eggbank_core::journey::JourneyStage;
use eggbank_core::types::{DocId, Timestamp};
use eggbank_db::repositories::{BatchRepo, EggRecordRepo, PatientRepo};
use eggbank_db::store::DocumentStore;
use eggbank_db::StoreError;
use serde::Serialize;

use crate::error::PipelineError;

/// A reviewer's decision on one batch.
#[derive(Debug, Clone)]
pub struct ApprovalDecision {
    pub approved: bool,
    pub notes: Option<String>,
    pub approved_by: DocId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalOutcome {
    pub batch_id: DocId,
    pub status: EligibilityStatus,
    pub approved_by: DocId,
    pub approved_at: Timestamp,
    pub egg_record_id: Option<DocId>,
    /// New patient stage, if the decision moved the patient forward.
    pub patient_stage: Option<JourneyStage>,
}

#[derive(Clone)]
pub struct EligibilityApproval {
    store: Arc<dyn DocumentStore>,
}

impl EligibilityApproval {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Record the decision on the batch and its egg record. An approval also
    /// advances the patient to the eligibility stage.
    pub async fn approve_eligibility(
        &self,
        batch_id: &str,
        decision: &ApprovalDecision,
    ) -> Result<ApprovalOutcome, PipelineError> {
        let store = self.store.as_ref();
        let batch = BatchRepo::find_by_id(store, batch_id)
            .await?
            .ok_or_else(|| PipelineError::BatchNotFound(batch_id.to_string()))?;

        let status = EligibilityStatus::from_decision(decision.approved);
        let now = Utc::now();
        let notes = decision.notes.as_deref().filter(|n| !n.is_empty());
        BatchRepo::record_decision(store, batch_id, status, &decision.approved_by, notes, now)
            .await?;

        let egg_record_id = match EggRecordRepo::find_by_batch(store, batch_id).await? {
            Some(record) => {
                EggRecordRepo::record_decision(store, &record.id, status, &decision.approved_by, now)
                    .await?;
                Some(record.id)
            }
            None => None,
        };

        let patient_stage = if decision.approved && !batch.patient_id.is_empty() {
            match PatientRepo::advance_stage(store, &batch.patient_id, JourneyStage::Eligibility, now)
                .await
            {
                Ok(stage) => stage,
                Err(StoreError::NotFound { .. }) => {
                    tracing::warn!(
                        batch_id,
                        patient_id = %batch.patient_id,
                        "Patient not found; stage not advanced",
                    );
                    None
                }
                Err(e) => return Err(e.into()),
            }
        } else {
            None
        };

        tracing::info!(
            batch_id,
            status = ?status,
            approved_by = %decision.approved_by,
            "Eligibility decision recorded",
        );

        Ok(ApprovalOutcome {
            batch_id: batch_id.to_string(),
            status,
            approved_by: decision.approved_by.clone(),
            approved_at: now,
            egg_record_id,
            patient_stage,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use eggbank_core::eligibility::MaturityCounts;
    use eggbank_db::store::{patch, MemoryDocumentStore, PATIENTS, RETRIEVAL_BATCHES};
    use serde_json::json;

    use super::*;

    fn decision(approved: bool) -> ApprovalDecision {
        ApprovalDecision {
            approved,
            notes: Some("reviewed".to_string()),
            approved_by: "doc1".to_string(),
        }
    }

    async fn seeded(stage: &str) -> Arc<MemoryDocumentStore> {
        let store = Arc::new(MemoryDocumentStore::new());
        store
            .set(RETRIEVAL_BATCHES, "b1", patch(json!({"patientId": "p1"})))
            .await
            .unwrap();
        store
            .set(PATIENTS, "p1", patch(json!({"fullName": "A", "role": "donor", "stage": stage})))
            .await
            .unwrap();
        let counts = MaturityCounts { mii: 2, mi: 1, total: 3 };
        EggRecordRepo::upsert_counts(store.as_ref(), "p1", "b1", counts, None, Utc::now())
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn approval_mirrors_to_egg_record_and_advances_stage() {
        let store = seeded("retrieval").await;
        let approval = EligibilityApproval::new(store.clone());

        let outcome = approval.approve_eligibility("b1", &decision(true)).await.unwrap();
        assert_eq!(outcome.status, EligibilityStatus::Approved);
        assert_eq!(outcome.patient_stage, Some(JourneyStage::Eligibility));

        let batch = BatchRepo::find_by_id(store.as_ref(), "b1").await.unwrap().unwrap();
        assert_eq!(batch.eligibility_status, EligibilityStatus::Approved);
        assert_eq!(batch.approved_by.as_deref(), Some("doc1"));
        assert_eq!(batch.notes.as_deref(), Some("reviewed"));

        let record = EggRecordRepo::find_by_batch(store.as_ref(), "b1").await.unwrap().unwrap();
        assert_eq!(Some(record.id), outcome.egg_record_id);
        assert_eq!(record.eligibility_status, EligibilityStatus::Approved);

        let patient = PatientRepo::find_by_id(store.as_ref(), "p1").await.unwrap().unwrap();
        assert_eq!(patient.journey_stage(), JourneyStage::Eligibility);
    }

    #[tokio::test]
    async fn rejection_leaves_stage_alone() {
        let store = seeded("retrieval").await;
        let outcome = EligibilityApproval::new(store.clone())
            .approve_eligibility("b1", &decision(false))
            .await
            .unwrap();
        assert_eq!(outcome.status, EligibilityStatus::Rejected);
        assert!(outcome.patient_stage.is_none());

        let patient = PatientRepo::find_by_id(store.as_ref(), "p1").await.unwrap().unwrap();
        assert_eq!(patient.journey_stage(), JourneyStage::Retrieval);
    }

    #[tokio::test]
    async fn missing_batch_is_batch_not_found() {
        let approval = EligibilityApproval::new(Arc::new(MemoryDocumentStore::new()));
        let err = approval.approve_eligibility("nope", &decision(true)).await.unwrap_err();
        assert_matches!(err, PipelineError::BatchNotFound(_));
    }
}
