//! Frame processor: one frame through inference and the rule engine.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use eggbank_core::maturity::{classify, Maturity};
use eggbank_core::types::DocId;
use eggbank_db::models::frame::{DetectionResults, EvaluationResult};
use eggbank_db::repositories::FrameRepo;
use eggbank_db::store::DocumentStore;
use serde::Serialize;

use crate::error::PipelineError;
use crate::inference::InferenceAdapter;

/// Result of a successfully processed frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameOutcome {
    pub frame_id: DocId,
    pub maturity: Maturity,
}

/// Runs inference and classification for single frames and writes the
/// outcome back to the frame record.
#[derive(Clone)]
pub struct FrameProcessor {
    store: Arc<dyn DocumentStore>,
    inference: Arc<InferenceAdapter>,
    model_version: String,
}

impl FrameProcessor {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        inference: Arc<InferenceAdapter>,
        model_version: impl Into<String>,
    ) -> Self {
        Self {
            store,
            inference,
            model_version: model_version.into(),
        }
    }

    /// Process one frame.
    ///
    /// On success the detections and the evaluation are written in one
    /// update that also clears any earlier error. On inference failure the
    /// error is written to the frame and returned as
    /// [`PipelineError::InferenceFailed`].
    pub async fn process_frame(
        &self,
        frame_id: &str,
        frame_path: &Path,
    ) -> Result<FrameOutcome, PipelineError> {
        let output = match self.inference.infer(frame_path).await {
            Ok(output) => output,
            Err(source) => {
                tracing::warn!(frame_id, error = %source, "Frame inference failed");
                self.record_error(frame_id, &source.to_string()).await;
                return Err(PipelineError::InferenceFailed {
                    frame_id: frame_id.to_string(),
                    source,
                });
            }
        };

        let classification = classify(&output.detections);
        let detections = DetectionResults {
            detections: output.detections,
            inference_timestamp: output.inference_timestamp,
            model_version: Some(self.model_version.clone()),
        };
        let evaluation = EvaluationResult {
            maturity: classification.maturity,
            quality: classification.quality,
            evaluated_at: Some(Utc::now()),
        };

        FrameRepo::record_success(
            self.store.as_ref(),
            frame_id,
            &detections,
            &evaluation,
            Utc::now(),
        )
        .await?;

        tracing::debug!(frame_id, maturity = ?classification.maturity, "Frame evaluated");
        Ok(FrameOutcome {
            frame_id: frame_id.to_string(),
            maturity: classification.maturity,
        })
    }

    /// Write an error onto a frame. A failed write is logged, not raised, so
    /// the original failure reaches the caller.
    pub async fn record_error(&self, frame_id: &str, message: &str) {
        if let Err(e) =
            FrameRepo::record_failure(self.store.as_ref(), frame_id, message, Utc::now()).await
        {
            tracing::warn!(frame_id, error = %e, "Failed to record frame error");
        }
    }
}
