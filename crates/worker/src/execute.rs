//! Execution of one claimed task under its time limits.

use eggbank_pipeline::batch::BatchProcessor;
use eggbank_pipeline::queue::EvaluationTask;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::config::TimeLimits;

/// How a task ended.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    /// Stored as the task result.
    Completed(Value),
    Failed {
        error: String,
        /// The worker must stop claiming tasks and exit.
        fatal: bool,
    },
}

impl TaskOutcome {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Failed { fatal: true, .. })
    }

    fn failed(error: impl Into<String>) -> Self {
        Self::Failed {
            error: error.into(),
            fatal: false,
        }
    }
}

/// Decode and run a task.
///
/// At the soft limit the batch is asked to stop before its next frame and
/// finalizes what it has. At the hard limit the run is aborted, the
/// evaluation request is marked failed and the outcome is fatal, since the
/// model process may be left mid-request.
pub async fn execute_task(
    processor: &BatchProcessor,
    task_name: &str,
    payload: Value,
    limits: TimeLimits,
) -> TaskOutcome {
    let task = match EvaluationTask::decode(task_name, payload) {
        Ok(task) => task,
        Err(e) => {
            tracing::error!(task_name, error = %e, "Undecodable task");
            return TaskOutcome::failed(e.to_string());
        }
    };

    let EvaluationTask::ProcessBatch(args) = task;
    let batch_id = args.batch_id.clone();
    let stop = CancellationToken::new();

    let mut handle = {
        let processor = processor.clone();
        let stop = stop.clone();
        tokio::spawn(async move {
            processor
                .process_batch(&args.batch_id, &args.frame_ids, args.force, &stop)
                .await
        })
    };

    let joined = match tokio::time::timeout(limits.soft, &mut handle).await {
        Ok(joined) => joined,
        Err(_) => {
            tracing::warn!(
                batch_id = %batch_id,
                soft_limit_secs = limits.soft.as_secs(),
                "Soft time limit reached; stopping after current frame",
            );
            stop.cancel();
            let grace = limits.hard.saturating_sub(limits.soft);
            match tokio::time::timeout(grace, &mut handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    handle.abort();
                    let message = format!(
                        "Task exceeded hard time limit of {}s",
                        limits.hard.as_secs()
                    );
                    tracing::error!(batch_id = %batch_id, "{message}");
                    processor.record_request_failure(&batch_id, &message).await;
                    return TaskOutcome::Failed {
                        error: message,
                        fatal: true,
                    };
                }
            }
        }
    };

    match joined {
        Ok(Ok(report)) => match serde_json::to_value(&report) {
            Ok(result) => TaskOutcome::Completed(result),
            Err(e) => TaskOutcome::failed(format!("Failed to encode batch report: {e}")),
        },
        Ok(Err(e)) => TaskOutcome::Failed {
            error: e.to_string(),
            fatal: e.is_fatal(),
        },
        Err(join_err) => {
            let message = format!("Batch task panicked: {join_err}");
            tracing::error!(batch_id = %batch_id, "{message}");
            processor.record_request_failure(&batch_id, &message).await;
            TaskOutcome::failed(message)
        }
    }
}
