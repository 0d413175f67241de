//! Retrieval batch documents.

use eggbank_core::eligibility::{EligibilityStatus, SuggestedEligibility};
use eggbank_core::evaluation_status::ProcessingStatus;
use eggbank_core::types::{DocId, Timestamp};
use serde::{Deserialize, Serialize};

/// A record from the `retrievalBatches` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalBatch {
    pub id: DocId,
    pub patient_id: DocId,
    #[serde(default)]
    pub created_by: Option<DocId>,
    #[serde(default, with = "crate::timestamp::optional")]
    pub created_at: Option<Timestamp>,
    #[serde(default, with = "crate::timestamp::optional")]
    pub updated_at: Option<Timestamp>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: ProcessingStatus,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub result_summary: ResultSummary,
    #[serde(default)]
    pub suggested_eligibility: Option<SuggestedEligibility>,
    #[serde(default)]
    pub eligibility_percentage: Option<f64>,
    #[serde(default)]
    pub eligibility_status: EligibilityStatus,
    #[serde(default)]
    pub approved_by: Option<DocId>,
    #[serde(default, with = "crate::timestamp::optional")]
    pub approved_at: Option<Timestamp>,
}

/// Frame totals of the last completed evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSummary {
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub total_frames: u32,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub mii: u32,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub mi: u32,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn minimal_batch_gets_defaults_and_null_counts_are_zero() {
        let batch: RetrievalBatch = serde_json::from_value(json!({
            "id": "b1",
            "patientId": "p1",
            "resultSummary": {"totalFrames": 0, "mii": null}
        }))
        .unwrap();
        assert_eq!(batch.result_summary, ResultSummary::default());
        assert_eq!(batch.status, ProcessingStatus::Pending);
        assert_eq!(batch.eligibility_status, EligibilityStatus::Pending);
        assert!(batch.suggested_eligibility.is_none());
    }

    #[test]
    fn summary_uses_camel_case() {
        let value = serde_json::to_value(ResultSummary {
            total_frames: 3,
            mii: 2,
            mi: 1,
        })
        .unwrap();
        assert_eq!(value, json!({"totalFrames": 3, "mii": 2, "mi": 1}));
    }
}
