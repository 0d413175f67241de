//! Batch processor.
//!
//! Frames are processed one after another within a single task. One bad
//! frame never aborts the rest of the batch: its error is written to the
//! frame and counted. The request's frame list is updated in memory and
//! written back once at the end.

use std::sync::Arc;

use chrono::Utc;
use eggbank_core::evaluation_status::{BatchTally, ProcessingStatus};
use eggbank_core::types::DocId;
use eggbank_db::blob::BlobStore;
use eggbank_db::models::evaluation_request::EvaluationRequest;
use eggbank_db::repositories::{BatchRepo, EvaluationRequestRepo, FrameRepo};
use eggbank_db::store::DocumentStore;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::eligibility::EligibilityAggregator;
use crate::error::PipelineError;
use crate::frame::FrameProcessor;
use crate::inference::InferenceError;

/// Summary of one batch run, stored as the task result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub batch_id: DocId,
    #[serde(flatten)]
    pub tally: BatchTally,
    /// Terminal status written to the batch, if any frame was attempted.
    pub status: Option<ProcessingStatus>,
    /// Frames left unattempted because the run was stopped early.
    pub skipped_remaining: u32,
}

/// Runs the frame processor over the frames of one batch.
#[derive(Clone)]
pub struct BatchProcessor {
    store: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    frames: FrameProcessor,
    aggregator: EligibilityAggregator,
}

impl BatchProcessor {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        frames: FrameProcessor,
    ) -> Self {
        let aggregator = EligibilityAggregator::new(Arc::clone(&store));
        Self {
            store,
            blobs,
            frames,
            aggregator,
        }
    }

    /// Process `frame_ids` of a batch.
    ///
    /// With `force == false`, frames that already carry detection results
    /// are skipped and counted as `processed`. Cancelling `stop` ends the
    /// run before the next frame; what was done so far is finalized
    /// normally.
    ///
    /// A model that cannot be loaded stops the run after finalizing and is
    /// returned as an error. Any other failure outside a single frame is
    /// recorded on the evaluation request and returned.
    pub async fn process_batch(
        &self,
        batch_id: &str,
        frame_ids: &[DocId],
        force: bool,
        stop: &CancellationToken,
    ) -> Result<BatchReport, PipelineError> {
        match self.run(batch_id, frame_ids, force, stop).await {
            Ok((report, None)) => Ok(report),
            Ok((_, Some(fatal))) => Err(fatal),
            Err(e) => {
                tracing::error!(batch_id, error = %e, "Batch processing failed");
                self.record_request_failure(batch_id, &e.to_string()).await;
                Err(e)
            }
        }
    }

    /// Mark the batch's evaluation request failed, e.g. after the task was
    /// killed. Failures to write are logged.
    pub async fn record_request_failure(&self, batch_id: &str, message: &str) {
        let store = self.store.as_ref();
        let result = async {
            if let Some(request) = EvaluationRequestRepo::find_by_batch(store, batch_id).await? {
                EvaluationRequestRepo::record_failure(store, &request.id, message, Utc::now())
                    .await?;
            }
            Ok::<_, PipelineError>(())
        }
        .await;
        if let Err(e) = result {
            tracing::warn!(batch_id, error = %e, "Failed to record request failure");
        }
    }

    async fn run(
        &self,
        batch_id: &str,
        frame_ids: &[DocId],
        force: bool,
        stop: &CancellationToken,
    ) -> Result<(BatchReport, Option<PipelineError>), PipelineError> {
        let store = self.store.as_ref();

        let mut request: Option<EvaluationRequest> =
            match EvaluationRequestRepo::find_by_batch(store, batch_id).await {
                Ok(request) => request,
                Err(e) => {
                    tracing::warn!(batch_id, error = %e, "Failed to load evaluation request");
                    None
                }
            };

        tracing::info!(batch_id, frames = frame_ids.len(), force, "Batch processing started");

        let mut tally = BatchTally::default();
        let mut fatal: Option<PipelineError> = None;
        let mut attempted = 0usize;

        for frame_id in frame_ids {
            if stop.is_cancelled() {
                tracing::warn!(batch_id, "Batch run stopped before completion");
                break;
            }
            attempted += 1;

            let frame = match FrameRepo::find_by_id(store, frame_id).await {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    tracing::warn!(batch_id, frame_id = %frame_id, "Frame record missing");
                    tally.failed += 1;
                    mark(&mut request, frame_id, ProcessingStatus::Failed);
                    continue;
                }
                Err(e) => {
                    tracing::warn!(batch_id, frame_id = %frame_id, error = %e, "Frame record unreadable");
                    tally.failed += 1;
                    mark(&mut request, frame_id, ProcessingStatus::Failed);
                    continue;
                }
            };

            if !force && frame.has_detections() {
                tally.processed += 1;
                continue;
            }

            let path = match self.blobs.resolve(&frame.frame_url) {
                Ok(path) => path,
                Err(e) => {
                    tracing::warn!(batch_id, frame_id = %frame_id, error = %e, "Frame path unresolvable");
                    self.frames.record_error(frame_id, &e.to_string()).await;
                    tally.failed += 1;
                    mark(&mut request, frame_id, ProcessingStatus::Failed);
                    continue;
                }
            };

            match self.frames.process_frame(frame_id, &path).await {
                Ok(_) => {
                    tally.success += 1;
                    mark(&mut request, frame_id, ProcessingStatus::Completed);
                }
                Err(e) => {
                    tally.failed += 1;
                    mark(&mut request, frame_id, ProcessingStatus::Failed);
                    if let PipelineError::InferenceFailed {
                        source: InferenceError::ModelUnavailable(_),
                        ..
                    } = &e
                    {
                        tracing::error!(batch_id, error = %e, "Detection model unavailable; stopping batch");
                        fatal = Some(e);
                        break;
                    }
                }
            }
        }

        let now = Utc::now();
        if let Some(request) = &request {
            if !request.frame_list.is_empty() {
                if let Err(e) =
                    EvaluationRequestRepo::update_frame_list(store, &request.id, &request.frame_list, now)
                        .await
                {
                    tracing::warn!(batch_id, error = %e, "Failed to write frame list");
                }
            }
        }

        let status = tally.outcome();
        if let Some(status) = status {
            BatchRepo::set_status(store, batch_id, status, now).await?;
            if let Some(request) = &request {
                EvaluationRequestRepo::set_status(store, &request.id, status, now).await?;
            }
        }

        if status == Some(ProcessingStatus::Completed) && tally.success > 0 {
            if let Err(e) = self.aggregator.aggregate(batch_id).await {
                tracing::error!(batch_id, error = %e, "Eligibility aggregation failed");
            }
        }

        tracing::info!(
            batch_id,
            processed = tally.processed,
            success = tally.success,
            failed = tally.failed,
            status = ?status,
            "Batch processing finished",
        );

        let report = BatchReport {
            batch_id: batch_id.to_string(),
            tally,
            status,
            skipped_remaining: (frame_ids.len() - attempted) as u32,
        };
        Ok((report, fatal))
    }
}

/// Set the status of a frame in the in-memory request snapshot.
fn mark(request: &mut Option<EvaluationRequest>, frame_id: &str, status: ProcessingStatus) {
    if let Some(item) = request
        .as_mut()
        .and_then(|r| r.frame_list.iter_mut().find(|i| i.frame_id == frame_id))
    {
        item.status = status;
    }
}
