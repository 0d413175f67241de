use axum::extract::{Path, State};
use axum::http::StatusCode;

use crate::error::AppResult;
use crate::middleware::actor::Actor;
use crate::state::AppState;

/// DELETE /api/v1/frames/{frame_id}
pub async fn delete_frame(
    actor: Actor,
    State(state): State<AppState>,
    Path(frame_id): Path<String>,
) -> AppResult<StatusCode> {
    state.intake.delete_frame(&frame_id).await?;
    tracing::info!(user_id = %actor.user_id, frame_id = %frame_id, "Frame deleted by user");
    Ok(StatusCode::NO_CONTENT)
}
