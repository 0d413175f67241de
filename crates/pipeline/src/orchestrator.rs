//! Evaluation orchestrator: the start and re-evaluate entry points.
//!
//! Both prepare the evaluation request and the batch synchronously, then
//! hand the frame work to the task queue and return without waiting for it.

use std::sync::Arc;

use chrono::Utc;
use eggbank_core::evaluation_status::ProcessingStatus;
use eggbank_core::types::DocId;
use eggbank_db::models::evaluation_request::{FrameListItem, NewEvaluationRequest};
use eggbank_db::models::frame::Frame;
use eggbank_db::repositories::{BatchRepo, EvaluationRequestRepo, FrameRepo};
use eggbank_db::store::DocumentStore;
use eggbank_db::StoreError;
use serde::Serialize;

use crate::error::PipelineError;
use crate::queue::{EvaluationTask, ProcessBatchArgs, TaskHandle, TaskQueue};

/// Which entry point produced a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DispatchKind {
    Started,
    ReEvaluationStarted,
    /// Nothing to process; the request was completed without dispatch.
    Completed,
}

/// Returned to the caller immediately after dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationReceipt {
    pub evaluation_request_id: DocId,
    pub task: Option<TaskHandle>,
    pub status: DispatchKind,
    pub frames_to_process: usize,
    pub total_frames: usize,
}

/// Entry points that create or reset evaluation requests and dispatch the
/// batch processor.
#[derive(Clone)]
pub struct EvaluationOrchestrator {
    store: Arc<dyn DocumentStore>,
    queue: Arc<dyn TaskQueue>,
}

impl EvaluationOrchestrator {
    pub fn new(store: Arc<dyn DocumentStore>, queue: Arc<dyn TaskQueue>) -> Self {
        Self { store, queue }
    }

    /// Start the first evaluation of a batch.
    ///
    /// Only frames without detection results are dispatched. Fails with
    /// [`PipelineError::AlreadyStarted`] if the batch already has a request.
    pub async fn start(
        &self,
        batch_id: &str,
        initiated_by: &str,
    ) -> Result<EvaluationReceipt, PipelineError> {
        let store = self.store.as_ref();
        self.require_batch(batch_id).await?;

        if EvaluationRequestRepo::find_by_batch(store, batch_id).await?.is_some() {
            return Err(already_started(batch_id));
        }

        let now = Utc::now();
        let input = NewEvaluationRequest {
            batch_id: batch_id.to_string(),
            initiated_by: initiated_by.to_string(),
            created_at: now,
            updated_at: now,
            status: ProcessingStatus::Pending,
            frame_list: Vec::new(),
        };
        let request_id = match EvaluationRequestRepo::create(store, &input).await {
            Ok(id) => id,
            Err(StoreError::AlreadyExists { .. }) => return Err(already_started(batch_id)),
            Err(e) => return Err(e.into()),
        };

        let result = async {
            let frames = FrameRepo::list_by_batch(store, batch_id).await?;
            let frame_list: Vec<FrameListItem> = frames.iter().map(snapshot_item).collect();
            let work: Vec<DocId> = frames
                .iter()
                .filter(|f| !f.has_detections())
                .map(|f| f.id.clone())
                .collect();
            self.dispatch(batch_id, &request_id, frame_list, work, false, DispatchKind::Started)
                .await
        }
        .await;

        self.finish(batch_id, &request_id, result).await
    }

    /// Re-run every frame of a batch, overwriting earlier results.
    ///
    /// Reuses the batch's request (reset to `pending`) or creates one.
    pub async fn re_evaluate(
        &self,
        batch_id: &str,
        initiated_by: &str,
    ) -> Result<EvaluationReceipt, PipelineError> {
        let store = self.store.as_ref();
        self.require_batch(batch_id).await?;

        let now = Utc::now();
        let request_id = match EvaluationRequestRepo::find_by_batch(store, batch_id).await? {
            Some(existing) => {
                EvaluationRequestRepo::reset(store, &existing.id, initiated_by, now).await?;
                existing.id
            }
            None => {
                let input = NewEvaluationRequest {
                    batch_id: batch_id.to_string(),
                    initiated_by: initiated_by.to_string(),
                    created_at: now,
                    updated_at: now,
                    status: ProcessingStatus::Pending,
                    frame_list: Vec::new(),
                };
                match EvaluationRequestRepo::create(store, &input).await {
                    Ok(id) => id,
                    Err(StoreError::AlreadyExists { id, .. }) => {
                        EvaluationRequestRepo::reset(store, &id, initiated_by, now).await?;
                        id
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        };

        let result = async {
            BatchRepo::begin_reevaluation(store, batch_id, Utc::now()).await?;
            let frames = FrameRepo::list_by_batch(store, batch_id).await?;
            let frame_list: Vec<FrameListItem> = frames
                .iter()
                .map(|f| FrameListItem {
                    frame_id: f.id.clone(),
                    frame_url: f.frame_url.clone(),
                    status: ProcessingStatus::Pending,
                })
                .collect();
            let work: Vec<DocId> = frames.iter().map(|f| f.id.clone()).collect();
            self.dispatch(
                batch_id,
                &request_id,
                frame_list,
                work,
                true,
                DispatchKind::ReEvaluationStarted,
            )
            .await
        }
        .await;

        self.finish(batch_id, &request_id, result).await
    }

    async fn require_batch(&self, batch_id: &str) -> Result<(), PipelineError> {
        BatchRepo::find_by_id(self.store.as_ref(), batch_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| PipelineError::BatchNotFound(batch_id.to_string()))
    }

    /// Write the frame snapshot and statuses, then enqueue the work set. An
    /// empty work set completes the request and the batch directly.
    async fn dispatch(
        &self,
        batch_id: &str,
        request_id: &str,
        frame_list: Vec<FrameListItem>,
        work: Vec<DocId>,
        force: bool,
        kind: DispatchKind,
    ) -> Result<EvaluationReceipt, PipelineError> {
        let store = self.store.as_ref();
        let total_frames = frame_list.len();
        let frames_to_process = work.len();
        let now = Utc::now();

        if work.is_empty() {
            EvaluationRequestRepo::set_frame_list(
                store,
                request_id,
                &frame_list,
                ProcessingStatus::Completed,
                now,
            )
            .await?;
            BatchRepo::set_status(store, batch_id, ProcessingStatus::Completed, now).await?;
            tracing::info!(batch_id, total_frames, "Nothing to evaluate; batch completed");
            return Ok(EvaluationReceipt {
                evaluation_request_id: request_id.to_string(),
                task: None,
                status: DispatchKind::Completed,
                frames_to_process,
                total_frames,
            });
        }

        EvaluationRequestRepo::set_frame_list(
            store,
            request_id,
            &frame_list,
            ProcessingStatus::Processing,
            now,
        )
        .await?;
        BatchRepo::set_status(store, batch_id, ProcessingStatus::Processing, now).await?;

        let task = self
            .queue
            .enqueue(EvaluationTask::ProcessBatch(ProcessBatchArgs {
                batch_id: batch_id.to_string(),
                frame_ids: work,
                force,
            }))
            .await?;

        tracing::info!(
            batch_id,
            task_id = %task.id,
            frames_to_process,
            total_frames,
            force,
            "Batch evaluation dispatched",
        );
        Ok(EvaluationReceipt {
            evaluation_request_id: request_id.to_string(),
            task: Some(task),
            status: kind,
            frames_to_process,
            total_frames,
        })
    }

    /// Record a preparation failure on the request before returning it.
    async fn finish(
        &self,
        batch_id: &str,
        request_id: &str,
        result: Result<EvaluationReceipt, PipelineError>,
    ) -> Result<EvaluationReceipt, PipelineError> {
        if let Err(e) = &result {
            tracing::error!(batch_id, error = %e, "Evaluation dispatch failed");
            if let Err(write_err) = EvaluationRequestRepo::record_failure(
                self.store.as_ref(),
                request_id,
                &e.to_string(),
                Utc::now(),
            )
            .await
            {
                tracing::warn!(batch_id, error = %write_err, "Failed to record request failure");
            }
        }
        result
    }
}

fn already_started(batch_id: &str) -> PipelineError {
    PipelineError::AlreadyStarted {
        batch_id: batch_id.to_string(),
    }
}

/// Snapshot entry for the first run: frames already evaluated are
/// `completed`, frames with a recorded error are `failed`.
fn snapshot_item(frame: &Frame) -> FrameListItem {
    let status = if frame.evaluation_result.is_some() {
        ProcessingStatus::Completed
    } else if frame.error.is_some() {
        ProcessingStatus::Failed
    } else {
        ProcessingStatus::Pending
    };
    FrameListItem {
        frame_id: frame.id.clone(),
        frame_url: frame.frame_url.clone(),
        status,
    }
}
