use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, post};
use axum::Router;

use crate::handlers::batch;
use crate::state::AppState;

/// Routes mounted at `/batches`.
///
/// ```text
/// DELETE /{batch_id}            -> delete_batch
/// POST   /{batch_id}/approve    -> approve_eligibility
/// POST   /{batch_id}/frames     -> upload_frame (body capped at max_upload_bytes)
/// ```
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/{batch_id}", delete(batch::delete_batch))
        .route("/{batch_id}/approve", post(batch::approve_eligibility))
        .route(
            "/{batch_id}/frames",
            post(batch::upload_frame).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
}
