use eggbank_core::error::CoreError;
use eggbank_core::types::DocId;
use eggbank_db::StoreError;

use crate::inference::InferenceError;
use crate::queue::QueueError;

/// Errors raised by pipeline operations.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Inference or classification failed for one frame.
    #[error("Inference failed for frame {frame_id}: {source}")]
    InferenceFailed {
        frame_id: DocId,
        #[source]
        source: InferenceError,
    },

    #[error("Evaluation already started for batch {batch_id}; use re-evaluate to re-run")]
    AlreadyStarted { batch_id: DocId },

    #[error("Batch not found: {0}")]
    BatchNotFound(DocId),

    #[error("Evaluation request not found for batch {0}")]
    RequestNotFound(DocId),

    #[error("Frame not found: {0}")]
    FrameNotFound(DocId),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl PipelineError {
    /// Whether the error leaves the worker process unable to run further
    /// tasks (the detection model cannot be loaded or its process died).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InferenceFailed {
                source: InferenceError::ModelUnavailable(_),
                ..
            }
        )
    }
}
