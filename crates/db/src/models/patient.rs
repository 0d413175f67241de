//! Patient documents, as far as the pipeline reads them.

use eggbank_core::eligibility::PatientRole;
use eggbank_core::journey::JourneyStage;
use eggbank_core::types::{DocId, Timestamp};
use serde::{Deserialize, Serialize};

/// A record from the `patients` collection.
///
/// `role` and `stage` are kept as raw strings: records may carry values the
/// pipeline does not know about, which must not make the record unreadable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: DocId,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub medical_history: Option<serde_json::Value>,
    #[serde(default, with = "crate::timestamp::optional")]
    pub updated_at: Option<Timestamp>,
}

impl Patient {
    /// Donor or recipient, if the record carries a recognised role.
    pub fn patient_role(&self) -> Option<PatientRole> {
        parse(self.role.as_deref()?)
    }

    /// Current journey stage. Missing or unrecognised stages read as the
    /// first stage.
    pub fn journey_stage(&self) -> JourneyStage {
        self.stage.as_deref().and_then(parse).unwrap_or_default()
    }
}

fn parse<T: serde::de::DeserializeOwned>(raw: &str) -> Option<T> {
    serde_json::from_value(serde_json::Value::String(raw.to_string())).ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
