//! Handlers for batch evaluation: start, re-evaluate and status polling.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use eggbank_pipeline::orchestrator::EvaluationReceipt;

use crate::error::AppResult;
use crate::middleware::actor::Actor;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/evaluation/batch/{batch_id}/start
///
/// Start the first evaluation of a batch. Returns 202 when work was
/// dispatched, 200 when there was nothing to evaluate, 409 if the batch
/// was already started.
pub async fn start_evaluation(
    actor: Actor,
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let receipt = state.orchestrator.start(&batch_id, &actor.user_id).await?;
    tracing::info!(user_id = %actor.user_id, batch_id = %batch_id, "Evaluation started");
    Ok(receipt_response(receipt))
}

/// POST /api/v1/evaluation/batch/{batch_id}/re-evaluate
///
/// Re-run every frame of the batch, overwriting earlier results and
/// resetting any approval decision.
pub async fn re_evaluate(
    actor: Actor,
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let receipt = state.orchestrator.re_evaluate(&batch_id, &actor.user_id).await?;
    tracing::info!(user_id = %actor.user_id, batch_id = %batch_id, "Re-evaluation started");
    Ok(receipt_response(receipt))
}

/// GET /api/v1/evaluation/batch/{batch_id}/status
pub async fn get_status(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let report = state.reporter.get_status(&batch_id).await?;
    Ok(Json(DataResponse { data: report }))
}

fn receipt_response(receipt: EvaluationReceipt) -> impl IntoResponse {
    let status = if receipt.task.is_some() {
        StatusCode::ACCEPTED
    } else {
        StatusCode::OK
    };
    (status, Json(DataResponse { data: receipt }))
}
