//! Rows of the `tasks` queue table.

use eggbank_core::types::Timestamp;
use serde::Serialize;
use sqlx::FromRow;

use super::status::StatusId;

/// Database id type of the `tasks` table.
pub type TaskId = i64;

/// A row from the `tasks` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Task {
    pub id: TaskId,
    pub task_name: String,
    pub payload: serde_json::Value,
    pub status_id: StatusId,
    pub attempts: i32,
    pub worker_id: Option<String>,
    pub error_message: Option<String>,
    pub result: Option<serde_json::Value>,
    pub enqueued_at: Timestamp,
    pub claimed_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub updated_at: Timestamp,
}
