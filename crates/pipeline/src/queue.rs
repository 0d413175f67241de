//! Task queue collaborator.
//!
//! The orchestrator enqueues [`EvaluationTask`]s; worker processes claim and
//! run them. [`PgTaskQueue`] persists tasks in the `tasks` table; delivery is
//! at-least-once.

use async_trait::async_trait;
use eggbank_core::types::DocId;
use eggbank_db::repositories::TaskRepo;
use eggbank_db::DbPool;
use serde::{Deserialize, Serialize};

/// Task name of batch frame processing.
pub const PROCESS_BATCH_FRAMES: &str = "process_batch_frames";

/// Errors raised by the task queue.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Queue database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid task payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Unknown task: {0}")]
    UnknownTask(String),
}

/// Arguments of [`EvaluationTask::ProcessBatch`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessBatchArgs {
    pub batch_id: DocId,
    pub frame_ids: Vec<DocId>,
    /// Re-run frames that already carry detection results.
    #[serde(default)]
    pub force: bool,
}

/// A unit of work for the worker pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvaluationTask {
    ProcessBatch(ProcessBatchArgs),
}

impl EvaluationTask {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ProcessBatch(_) => PROCESS_BATCH_FRAMES,
        }
    }

    pub fn payload(&self) -> Result<serde_json::Value, QueueError> {
        match self {
            Self::ProcessBatch(args) => Ok(serde_json::to_value(args)?),
        }
    }

    /// Rebuild a task from its stored name and payload.
    pub fn decode(name: &str, payload: serde_json::Value) -> Result<Self, QueueError> {
        match name {
            PROCESS_BATCH_FRAMES => Ok(Self::ProcessBatch(serde_json::from_value(payload)?)),
            other => Err(QueueError::UnknownTask(other.to_string())),
        }
    }
}

/// Identifier of an enqueued task, returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskHandle {
    pub id: String,
    pub name: &'static str,
}

#[async_trait]
pub trait TaskQueue: Send + Sync {
    async fn enqueue(&self, task: EvaluationTask) -> Result<TaskHandle, QueueError>;
}

/// Task queue on the `tasks` table.
#[derive(Clone)]
pub struct PgTaskQueue {
    pool: DbPool,
}

impl PgTaskQueue {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskQueue for PgTaskQueue {
    async fn enqueue(&self, task: EvaluationTask) -> Result<TaskHandle, QueueError> {
        let row = TaskRepo::enqueue(&self.pool, task.name(), &task.payload()?).await?;
        tracing::debug!(task_id = row.id, task_name = %row.task_name, "Task enqueued");
        Ok(TaskHandle {
            id: row.id.to_string(),
            name: task.name(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn payload_uses_camel_case_and_decodes_back() {
        let task = EvaluationTask::ProcessBatch(ProcessBatchArgs {
            batch_id: "b1".into(),
            frame_ids: vec!["f1".into(), "f2".into()],
            force: true,
        });
        let payload = task.payload().unwrap();
        assert_eq!(
            payload,
            json!({"batchId": "b1", "frameIds": ["f1", "f2"], "force": true})
        );
        assert_eq!(EvaluationTask::decode(task.name(), payload).unwrap(), task);
    }

    #[test]
    fn force_defaults_to_false() {
        let task = EvaluationTask::decode(
            PROCESS_BATCH_FRAMES,
            json!({"batchId": "b1", "frameIds": []}),
        )
        .unwrap();
        assert_matches!(task, EvaluationTask::ProcessBatch(ProcessBatchArgs { force: false, .. }));
    }

    #[test]
    fn unknown_task_name_is_rejected() {
        let err = EvaluationTask::decode("evaluate_batch", json!({})).unwrap_err();
        assert_matches!(err, QueueError::UnknownTask(_));
    }
}
