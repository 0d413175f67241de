//! Claim loop over the `tasks` table.
//!
//! Polls every `poll_interval`, hands stale claims back to the queue, and
//! claims tasks with `SELECT FOR UPDATE SKIP LOCKED` while pool permits are
//! free. Each claimed task runs on its own Tokio task.

use std::sync::Arc;

use eggbank_db::models::task::Task;
use eggbank_db::repositories::TaskRepo;
use eggbank_db::DbPool;
use eggbank_pipeline::batch::BatchProcessor;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::WorkerConfig;
use crate::execute::{execute_task, TaskOutcome};

/// Why [`Worker::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Shutdown was requested.
    Shutdown,
    /// The task allowance of this process is used up.
    Recycle,
    /// A task failed in a way that leaves the process unusable.
    Fatal,
}

pub struct Worker {
    pool: DbPool,
    processor: BatchProcessor,
    config: WorkerConfig,
    worker_id: String,
}

impl Worker {
    pub fn new(
        pool: DbPool,
        processor: BatchProcessor,
        config: WorkerConfig,
        worker_id: impl Into<String>,
    ) -> Self {
        Self {
            pool,
            processor,
            config,
            worker_id: worker_id.into(),
        }
    }

    /// Run until shutdown, recycling, or a fatal task failure. Running tasks
    /// are always drained before returning.
    pub async fn run(&self, cancel: CancellationToken) -> WorkerExit {
        let permits = Arc::new(Semaphore::new(self.config.concurrency));
        let mut running: JoinSet<bool> = JoinSet::new();
        let mut claimed: u32 = 0;
        let mut ticker = tokio::time::interval(self.config.poll_interval);

        tracing::info!(
            worker_id = %self.worker_id,
            concurrency = self.config.concurrency,
            max_tasks = self.config.max_tasks_per_child,
            "Worker started",
        );

        let exit = loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Worker shutting down");
                    break WorkerExit::Shutdown;
                }
                _ = ticker.tick() => {
                    if reap(&mut running) {
                        break WorkerExit::Fatal;
                    }
                    if claimed >= self.config.max_tasks_per_child {
                        if running.is_empty() {
                            break WorkerExit::Recycle;
                        }
                        continue;
                    }
                    if let Err(e) = self.try_claim(&permits, &mut running, &mut claimed).await {
                        tracing::error!(error = %e, "Claim cycle failed");
                    }
                }
            }
        };

        let remaining = running.len();
        if remaining > 0 {
            tracing::info!(remaining, "Waiting for running tasks");
        }
        let mut fatal = exit == WorkerExit::Fatal;
        while let Some(joined) = running.join_next().await {
            fatal |= joined.unwrap_or(false);
        }

        let exit = if fatal { WorkerExit::Fatal } else { exit };
        tracing::info!(worker_id = %self.worker_id, claimed, exit = ?exit, "Worker stopped");
        exit
    }

    /// One claim cycle: requeue stale claims, then claim while permits last.
    async fn try_claim(
        &self,
        permits: &Arc<Semaphore>,
        running: &mut JoinSet<bool>,
        claimed: &mut u32,
    ) -> Result<(), sqlx::Error> {
        let requeued =
            TaskRepo::requeue_stale(&self.pool, self.config.visibility_timeout.as_secs() as i64)
                .await?;
        if requeued > 0 {
            tracing::warn!(requeued, "Stale task claims returned to the queue");
        }

        while *claimed < self.config.max_tasks_per_child {
            let Ok(permit) = Arc::clone(permits).try_acquire_owned() else {
                break;
            };
            let Some(task) = TaskRepo::claim_next(&self.pool, &self.worker_id).await? else {
                break;
            };
            *claimed += 1;

            tracing::info!(
                task_id = task.id,
                task_name = %task.task_name,
                attempts = task.attempts,
                "Task claimed",
            );

            let pool = self.pool.clone();
            let processor = self.processor.clone();
            let limits = self.config.limits;
            running.spawn(async move {
                let _permit = permit;
                run_claimed(&pool, &processor, task, limits).await
            });
        }
        Ok(())
    }
}

/// Execute a claimed task and store its outcome. Returns whether the
/// outcome is fatal.
async fn run_claimed(
    pool: &DbPool,
    processor: &BatchProcessor,
    task: Task,
    limits: crate::config::TimeLimits,
) -> bool {
    let outcome = execute_task(processor, &task.task_name, task.payload, limits).await;

    let stored = match &outcome {
        TaskOutcome::Completed(result) => {
            tracing::info!(task_id = task.id, "Task completed");
            TaskRepo::complete(pool, task.id, result).await
        }
        TaskOutcome::Failed { error, fatal } => {
            tracing::error!(task_id = task.id, error = %error, fatal, "Task failed");
            TaskRepo::fail(pool, task.id, error).await
        }
    };
    if let Err(e) = stored {
        tracing::error!(task_id = task.id, error = %e, "Failed to store task outcome");
    }

    outcome.is_fatal()
}

/// Collect finished tasks. Returns `true` if any of them was fatal.
fn reap(running: &mut JoinSet<bool>) -> bool {
    let mut fatal = false;
    while let Some(joined) = running.try_join_next() {
        match joined {
            Ok(was_fatal) => fatal |= was_fatal,
            Err(e) => tracing::error!(error = %e, "Task runner panicked"),
        }
    }
    fatal
}
