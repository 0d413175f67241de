//! Read-side progress view of an evaluation run, built for frequent
//! polling.

use std::sync::Arc;

use eggbank_core::evaluation_status::{FrameProgress, ProcessingStatus};
use eggbank_core::types::DocId;
use eggbank_db::models::evaluation_request::{FrameListItem, ReportSummary};
use eggbank_db::models::frame::Frame;
use eggbank_db::repositories::{BatchRepo, EvaluationRequestRepo, FrameRepo};
use eggbank_db::store::DocumentStore;
use serde::Serialize;

use crate::error::PipelineError;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub evaluation_request_id: DocId,
    pub batch_id: DocId,
    pub status: ProcessingStatus,
    pub total_frames: u32,
    pub completed_frames: u32,
    pub failed_frames: u32,
    /// `(completed + failed) / total`, in `0.0..=1.0`.
    pub progress: f64,
    pub batch_status: Option<ProcessingStatus>,
    pub frame_list: Vec<FrameListItem>,
    pub report_summary: Option<ReportSummary>,
}

#[derive(Clone)]
pub struct StatusReporter {
    store: Arc<dyn DocumentStore>,
}

impl StatusReporter {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Progress of the batch's evaluation request.
    ///
    /// Counts come from the request's frame list. Only when that list is
    /// empty are the batch's frames scanned.
    pub async fn get_status(&self, batch_id: &str) -> Result<StatusReport, PipelineError> {
        let store = self.store.as_ref();
        let request = EvaluationRequestRepo::find_by_batch(store, batch_id)
            .await?
            .ok_or_else(|| PipelineError::RequestNotFound(batch_id.to_string()))?;

        let progress = if request.frame_list.is_empty() {
            let frames = FrameRepo::list_by_batch(store, batch_id).await?;
            FrameProgress::from_statuses(frames.iter().map(frame_status))
        } else {
            request.progress()
        };

        let batch_status = BatchRepo::find_by_id(store, batch_id)
            .await?
            .map(|batch| batch.status);

        Ok(StatusReport {
            status: progress.derive_status(request.status),
            total_frames: progress.total,
            completed_frames: progress.completed,
            failed_frames: progress.failed,
            progress: progress.fraction(),
            batch_status,
            evaluation_request_id: request.id,
            batch_id: request.batch_id,
            frame_list: request.frame_list,
            report_summary: request.report_summary,
        })
    }
}

/// Status of a frame judged from the results it carries.
fn frame_status(frame: &Frame) -> ProcessingStatus {
    if frame.evaluation_result.is_some() || frame.detection_results.is_some() {
        ProcessingStatus::Completed
    } else if frame.error.is_some() {
        ProcessingStatus::Failed
    } else {
        ProcessingStatus::Pending
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Utc;
    use eggbank_db::models::evaluation_request::NewEvaluationRequest;
    use eggbank_db::store::{patch, MemoryDocumentStore, FRAMES, RETRIEVAL_BATCHES};
    use serde_json::json;

    use super::*;

    fn item(id: &str, status: ProcessingStatus) -> FrameListItem {
        FrameListItem {
            frame_id: id.to_string(),
            frame_url: format!("b1/{id}.jpg"),
            status,
        }
    }

    async fn seed_request(
        store: &MemoryDocumentStore,
        status: ProcessingStatus,
        frame_list: Vec<FrameListItem>,
    ) {
        let now = Utc::now();
        EvaluationRequestRepo::create(
            store,
            &NewEvaluationRequest {
                batch_id: "b1".to_string(),
                initiated_by: "u1".to_string(),
                created_at: now,
                updated_at: now,
                status,
                frame_list,
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn missing_request_is_request_not_found() {
        let reporter = StatusReporter::new(Arc::new(MemoryDocumentStore::new()));
        let err = reporter.get_status("b1").await.unwrap_err();
        assert_matches!(err, PipelineError::RequestNotFound(id) if id == "b1");
    }

    #[tokio::test]
    async fn counts_come_from_frame_list_and_status_is_derived() {
        let store = Arc::new(MemoryDocumentStore::new());
        store
            .set(RETRIEVAL_BATCHES, "b1", patch(json!({"patientId": "p1", "status": "processing"})))
            .await
            .unwrap();
        seed_request(
            &store,
            ProcessingStatus::Completed,
            vec![
                item("f1", ProcessingStatus::Completed),
                item("f2", ProcessingStatus::Failed),
                item("f3", ProcessingStatus::Pending),
                item("f4", ProcessingStatus::Completed),
            ],
        )
        .await;

        let report = StatusReporter::new(store).get_status("b1").await.unwrap();
        assert_eq!(report.total_frames, 4);
        assert_eq!(report.completed_frames, 2);
        assert_eq!(report.failed_frames, 1);
        assert!((report.progress - 0.75).abs() < 1e-9);
        assert_eq!(report.status, ProcessingStatus::Processing);
        assert_eq!(report.batch_status, Some(ProcessingStatus::Processing));
        assert_eq!(report.frame_list.len(), 4);
    }

    #[tokio::test]
    async fn explicit_failure_is_kept() {
        let store = Arc::new(MemoryDocumentStore::new());
        seed_request(
            &store,
            ProcessingStatus::Failed,
            vec![item("f1", ProcessingStatus::Completed)],
        )
        .await;

        let report = StatusReporter::new(store).get_status("b1").await.unwrap();
        assert_eq!(report.status, ProcessingStatus::Failed);
        assert_eq!(report.batch_status, None);
    }

    #[tokio::test]
    async fn empty_frame_list_falls_back_to_frame_scan() {
        let store = Arc::new(MemoryDocumentStore::new());
        seed_request(&store, ProcessingStatus::Processing, Vec::new()).await;
        for data in [
            json!({"batchId": "b1", "frameURL": "b1/a.jpg", "evaluationResult": {"maturity": "MII", "quality": "likely reproducible"}}),
            json!({"batchId": "b1", "frameURL": "b1/b.jpg", "error": "unreadable"}),
            json!({"batchId": "b1", "frameURL": "b1/c.jpg"}),
            json!({"batchId": "b2", "frameURL": "b2/d.jpg", "error": "other batch"}),
        ] {
            store.create(FRAMES, patch(data)).await.unwrap();
        }

        let report = StatusReporter::new(store).get_status("b1").await.unwrap();
        assert_eq!(report.total_frames, 3);
        assert_eq!(report.completed_frames, 1);
        assert_eq!(report.failed_frames, 1);
        assert_eq!(report.status, ProcessingStatus::Processing);
    }

    #[tokio::test]
    async fn no_frames_at_all_reports_pending_with_zero_progress() {
        let store = Arc::new(MemoryDocumentStore::new());
        seed_request(&store, ProcessingStatus::Completed, Vec::new()).await;

        let report = StatusReporter::new(store).get_status("b1").await.unwrap();
        assert_eq!(report.total_frames, 0);
        assert_eq!(report.progress, 0.0);
        assert_eq!(report.status, ProcessingStatus::Pending);
    }
}
