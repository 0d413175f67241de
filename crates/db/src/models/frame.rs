//! Frame documents: one uploaded image and its derived results.

use eggbank_core::detection::Detection;
use eggbank_core::maturity::{Maturity, Quality};
use eggbank_core::types::{DocId, Timestamp};
use serde::{Deserialize, Serialize};

/// A record from the `frames` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub id: DocId,
    pub batch_id: DocId,
    #[serde(default)]
    pub patient_id: Option<DocId>,
    #[serde(default)]
    pub uploaded_by: Option<DocId>,
    #[serde(default, with = "crate::timestamp::optional")]
    pub uploaded_at: Option<Timestamp>,
    /// Blob path relative to the storage root.
    #[serde(rename = "frameURL", default)]
    pub frame_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detection_results: Option<DetectionResults>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation_result: Option<EvaluationResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, with = "crate::timestamp::optional")]
    pub updated_at: Option<Timestamp>,
}

impl Frame {
    /// Whether a previous run already produced detections for this frame.
    pub fn has_detections(&self) -> bool {
        self.detection_results.is_some()
    }

    pub fn maturity(&self) -> Option<Maturity> {
        self.evaluation_result.as_ref().map(|r| r.maturity)
    }
}

/// Raw model output stored on a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResults {
    pub detections: Vec<Detection>,
    #[serde(with = "crate::timestamp::required")]
    pub inference_timestamp: Timestamp,
    #[serde(default)]
    pub model_version: Option<String>,
}

/// Rule engine output stored on a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub maturity: Maturity,
    pub quality: Quality,
    #[serde(default, with = "crate::timestamp::optional")]
    pub evaluated_at: Option<Timestamp>,
}

/// Fields of a freshly uploaded frame.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFrame {
    pub batch_id: DocId,
    pub patient_id: DocId,
    pub uploaded_by: DocId,
    pub uploaded_at: Timestamp,
    #[serde(rename = "frameURL")]
    pub frame_url: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
