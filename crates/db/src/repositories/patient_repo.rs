//! Repository for the `patients` collection.

use eggbank_core::journey::JourneyStage;
use eggbank_core::medical_history;
use eggbank_core::types::Timestamp;
use serde_json::{json, Value};

use crate::error::StoreError;
use crate::models::patient::Patient;
use crate::store::{patch, DocumentStore, PATIENTS};

/// Typed access to patient records.
pub struct PatientRepo;

impl PatientRepo {
    pub async fn find_by_id(
        store: &dyn DocumentStore,
        id: &str,
    ) -> Result<Option<Patient>, StoreError> {
        store.get(PATIENTS, id).await?.map(|doc| doc.decode()).transpose()
    }

    /// Move the patient forward to `target`. Returns the new stage, or
    /// `None` when the patient is already at or past it.
    pub async fn advance_stage(
        store: &dyn DocumentStore,
        id: &str,
        target: JourneyStage,
        now: Timestamp,
    ) -> Result<Option<JourneyStage>, StoreError> {
        let patient = Self::find_by_id(store, id)
            .await?
            .ok_or_else(|| StoreError::not_found(PATIENTS, id))?;

        let Some(next) = patient.journey_stage().advance_to(target) else {
            return Ok(None);
        };
        store
            .update(PATIENTS, id, patch(json!({"stage": next, "updatedAt": now})))
            .await?;
        Ok(Some(next))
    }

    /// Deep-merge a partial medical history into the stored one. Returns the
    /// merged history.
    pub async fn merge_medical_history(
        store: &dyn DocumentStore,
        id: &str,
        history_patch: Value,
        now: Timestamp,
    ) -> Result<Value, StoreError> {
        let patient = Self::find_by_id(store, id)
            .await?
            .ok_or_else(|| StoreError::not_found(PATIENTS, id))?;

        let base = patient.medical_history.unwrap_or(Value::Null);
        let merged = medical_history::merge_json(base, history_patch);
        store
            .update(
                PATIENTS,
                id,
                patch(json!({"medicalHistory": merged.clone(), "updatedAt": now})),
            )
            .await?;
        Ok(merged)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
