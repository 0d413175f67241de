//! Handlers for retrieval batches: eligibility approval, frame upload and
//! deletion.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use eggbank_pipeline::approval::ApprovalDecision;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::actor::Actor;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ApproveEligibilityRequest {
    pub approved: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

/// POST /api/v1/batches/{batch_id}/approve
///
/// Approve or reject the batch's eligibility suggestion. An approval
/// advances the patient to the eligibility stage.
pub async fn approve_eligibility(
    actor: Actor,
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
    Json(input): Json<ApproveEligibilityRequest>,
) -> AppResult<impl IntoResponse> {
    let decision = ApprovalDecision {
        approved: input.approved,
        notes: input.notes,
        approved_by: actor.user_id,
    };
    let outcome = state.approval.approve_eligibility(&batch_id, &decision).await?;
    Ok(Json(DataResponse { data: outcome }))
}

/// POST /api/v1/batches/{batch_id}/frames
///
/// Upload one frame image (raw JPEG or PNG body).
pub async fn upload_frame(
    actor: Actor,
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    if body.is_empty() {
        return Err(AppError::BadRequest("Empty upload body".into()));
    }
    let frame = state
        .intake
        .upload_frame(&batch_id, &actor.user_id, &body)
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: frame })))
}

/// DELETE /api/v1/batches/{batch_id}
///
/// Delete the batch with its frames and their images.
pub async fn delete_batch(
    actor: Actor,
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let deletion = state.intake.delete_batch(&batch_id).await?;
    tracing::info!(user_id = %actor.user_id, batch_id = %batch_id, "Batch deleted by user");
    Ok(Json(DataResponse { data: deletion }))
}
