//! Route definitions for the `/evaluation` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::evaluation;
use crate::state::AppState;

/// Routes mounted at `/evaluation`.
///
/// ```text
/// POST   /batch/{batch_id}/start         -> start_evaluation
/// POST   /batch/{batch_id}/re-evaluate   -> re_evaluate
/// GET    /batch/{batch_id}/status        -> get_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/batch/{batch_id}/start", post(evaluation::start_evaluation))
        .route("/batch/{batch_id}/re-evaluate", post(evaluation::re_evaluate))
        .route("/batch/{batch_id}/status", get(evaluation::get_status))
}
