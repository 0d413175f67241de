//! Repository for the `tasks` queue table.
//!
//! Uses `TaskStatus` from `models::status` for all status transitions.

use sqlx::PgPool;

use crate::models::status::TaskStatus;
use crate::models::task::{Task, TaskId};

/// Column list for `tasks` queries.
const COLUMNS: &str = "\
    id, task_name, payload, status_id, attempts, worker_id, \
    error_message, result, enqueued_at, claimed_at, completed_at, updated_at";

/// Provides queue operations for background tasks.
pub struct TaskRepo;

impl TaskRepo {
    /// Append a pending task. Returns the stored row.
    pub async fn enqueue(
        pool: &PgPool,
        task_name: &str,
        payload: &serde_json::Value,
    ) -> Result<Task, sqlx::Error> {
        let query = format!(
            "INSERT INTO tasks (task_name, payload, status_id) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(task_name)
            .bind(payload)
            .bind(TaskStatus::Pending.id())
            .fetch_one(pool)
            .await
    }

    /// Atomically claim the oldest pending task for a worker.
    ///
    /// Uses `SELECT FOR UPDATE SKIP LOCKED` so concurrent workers never
    /// claim the same row.
    pub async fn claim_next(pool: &PgPool, worker_id: &str) -> Result<Option<Task>, sqlx::Error> {
        let query = format!(
            "UPDATE tasks \
             SET worker_id = $1, claimed_at = NOW(), status_id = $2, \
                 attempts = attempts + 1, updated_at = NOW() \
             WHERE id = ( \
                 SELECT id FROM tasks \
                 WHERE status_id = $3 \
                 ORDER BY enqueued_at ASC, id ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(worker_id)
            .bind(TaskStatus::Running.id())
            .bind(TaskStatus::Pending.id())
            .fetch_optional(pool)
            .await
    }

    /// Mark a task completed with its result payload.
    pub async fn complete(
        pool: &PgPool,
        task_id: TaskId,
        result: &serde_json::Value,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE tasks \
             SET status_id = $2, result = $3, error_message = NULL, \
                 completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(task_id)
        .bind(TaskStatus::Completed.id())
        .bind(result)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Mark a task failed with an error message.
    pub async fn fail(pool: &PgPool, task_id: TaskId, error: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE tasks \
             SET status_id = $2, error_message = $3, completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(task_id)
        .bind(TaskStatus::Failed.id())
        .bind(error)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Return running tasks claimed more than `visibility_secs` ago to the
    /// pending state. Returns the number of tasks re-queued.
    pub async fn requeue_stale(pool: &PgPool, visibility_secs: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE tasks \
             SET status_id = $1, worker_id = NULL, claimed_at = NULL, updated_at = NOW() \
             WHERE status_id = $2 \
               AND claimed_at < NOW() - make_interval(secs => $3)",
        )
        .bind(TaskStatus::Pending.id())
        .bind(TaskStatus::Running.id())
        .bind(visibility_secs as f64)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn find_by_id(pool: &PgPool, task_id: TaskId) -> Result<Option<Task>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tasks WHERE id = $1");
        sqlx::query_as::<_, Task>(&query)
            .bind(task_id)
            .fetch_optional(pool)
            .await
    }
}
