pub mod batches;
pub mod evaluation;
pub mod frames;
pub mod health;
pub mod patients;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /evaluation/batch/{batch_id}/start         start evaluation (POST)
/// /evaluation/batch/{batch_id}/re-evaluate   re-run all frames (POST)
/// /evaluation/batch/{batch_id}/status        progress (GET)
///
/// /batches/{batch_id}                        delete batch (DELETE)
/// /batches/{batch_id}/approve                eligibility decision (POST)
/// /batches/{batch_id}/frames                 upload frame (POST)
///
/// /frames/{frame_id}                         delete frame (DELETE)
///
/// /patients/{patient_id}/medical-history     merge medical history (PATCH)
/// ```
pub fn api_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .nest("/evaluation", evaluation::router())
        .nest("/batches", batches::router(max_upload_bytes))
        .nest("/frames", frames::router())
        .nest("/patients", patients::router())
}
