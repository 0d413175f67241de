use axum::routing::patch;
use axum::Router;

use crate::handlers::patient;
use crate::state::AppState;

/// Routes mounted at `/patients`.
///
/// ```text
/// PATCH  /{patient_id}/medical-history   -> merge_medical_history
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/{patient_id}/medical-history",
        patch(patient::merge_medical_history),
    )
}
