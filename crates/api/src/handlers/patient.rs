use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use eggbank_db::repositories::PatientRepo;
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::middleware::actor::Actor;
use crate::response::DataResponse;
use crate::state::AppState;

/// PATCH /api/v1/patients/{patient_id}/medical-history
///
/// Deep-merge a partial medical history into the stored one. Returns the
/// merged history.
pub async fn merge_medical_history(
    actor: Actor,
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
    Json(patch): Json<Value>,
) -> AppResult<Json<DataResponse<Value>>> {
    if !patch.is_object() {
        return Err(AppError::BadRequest(
            "Medical history patch must be a JSON object".into(),
        ));
    }
    let merged =
        PatientRepo::merge_medical_history(state.store.as_ref(), &patient_id, patch, Utc::now())
            .await?;
    tracing::info!(user_id = %actor.user_id, patient_id = %patient_id, "Medical history updated");
    Ok(Json(DataResponse { data: merged }))
}
