//! Eligibility aggregator.
//!
//! Runs after a batch completes with at least one success. Counts are always
//! recomputed from a fresh scan of the batch's frames, never carried over
//! from the processing run.

use std::sync::Arc;

use chrono::Utc;
use eggbank_core::eligibility::{assess, EligibilityAssessment, MaturityCounts};
use eggbank_core::types::DocId;
use eggbank_db::models::evaluation_request::ReportSummary;
use eggbank_db::models::retrieval_batch::ResultSummary;
use eggbank_db::repositories::{
    BatchRepo, EggRecordRepo, EvaluationRequestRepo, FrameRepo, PatientRepo,
};
use eggbank_db::store::DocumentStore;

use crate::error::PipelineError;

/// What one aggregation wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationOutcome {
    pub counts: MaturityCounts,
    /// `None` when the patient role is unknown or the batch has no frames.
    pub assessment: Option<EligibilityAssessment>,
    pub egg_record_id: Option<DocId>,
}

/// Rolls frame maturities up into batch, egg-record and request aggregates.
#[derive(Clone)]
pub struct EligibilityAggregator {
    store: Arc<dyn DocumentStore>,
}

impl EligibilityAggregator {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Recompute the aggregates of a batch.
    ///
    /// Returns `Ok(None)` when the batch has no patient, in which case
    /// nothing is written.
    pub async fn aggregate(&self, batch_id: &str) -> Result<Option<AggregationOutcome>, PipelineError> {
        let store = self.store.as_ref();
        let batch = BatchRepo::find_by_id(store, batch_id)
            .await?
            .ok_or_else(|| PipelineError::BatchNotFound(batch_id.to_string()))?;

        if batch.patient_id.is_empty() {
            tracing::warn!(batch_id, "Batch has no patient; skipping eligibility");
            return Ok(None);
        }

        let frames = FrameRepo::list_by_batch(store, batch_id).await?;
        let counts = MaturityCounts::tally(frames.iter().map(|f| f.maturity()));

        let role = PatientRepo::find_by_id(store, &batch.patient_id)
            .await?
            .and_then(|p| p.patient_role());
        if role.is_none() {
            tracing::warn!(
                batch_id,
                patient_id = %batch.patient_id,
                "Patient role unknown; no eligibility suggestion",
            );
        }
        let assessment = role.and_then(|role| assess(role, counts));

        let now = Utc::now();
        let summary = ResultSummary {
            total_frames: counts.total,
            mii: counts.mii,
            mi: counts.mi,
        };
        BatchRepo::record_assessment(store, batch_id, summary, assessment, now).await?;

        let egg_record_id = if counts.total > 0 {
            Some(
                EggRecordRepo::upsert_counts(
                    store,
                    &batch.patient_id,
                    batch_id,
                    counts,
                    assessment.map(|a| a.suggested),
                    now,
                )
                .await?,
            )
        } else {
            None
        };

        if let Some(request) = EvaluationRequestRepo::find_by_batch(store, batch_id).await? {
            let report = ReportSummary {
                total: counts.total,
                mii: counts.mii,
                mi: counts.mi,
            };
            EvaluationRequestRepo::set_report_summary(store, &request.id, report, now).await?;
        }

        tracing::info!(
            batch_id,
            mii = counts.mii,
            mi = counts.mi,
            total = counts.total,
            percentage = assessment.map(|a| a.percentage),
            "Eligibility aggregated",
        );

        Ok(Some(AggregationOutcome {
            counts,
            assessment,
            egg_record_id,
        }))
    }
}
