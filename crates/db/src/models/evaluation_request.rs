//! Evaluation request documents: the job record of one evaluation run.

use eggbank_core::evaluation_status::{FrameProgress, ProcessingStatus};
use eggbank_core::types::{DocId, Timestamp};
use serde::{Deserialize, Serialize};

/// A record from the `evaluationRequests` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRequest {
    pub id: DocId,
    pub batch_id: DocId,
    #[serde(default)]
    pub initiated_by: Option<DocId>,
    #[serde(default, with = "crate::timestamp::optional")]
    pub created_at: Option<Timestamp>,
    #[serde(default, with = "crate::timestamp::optional")]
    pub updated_at: Option<Timestamp>,
    #[serde(default)]
    pub status: ProcessingStatus,
    #[serde(default)]
    pub frame_list: Vec<FrameListItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_log: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_summary: Option<ReportSummary>,
}

impl EvaluationRequest {
    /// Progress counted from the frame list snapshot.
    pub fn progress(&self) -> FrameProgress {
        FrameProgress::from_statuses(self.frame_list.iter().map(|item| item.status))
    }
}

/// Per-frame entry of the request snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameListItem {
    pub frame_id: DocId,
    #[serde(rename = "frameURL", default)]
    pub frame_url: String,
    #[serde(default)]
    pub status: ProcessingStatus,
}

/// MII/MI totals written when a batch completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total: u32,
    pub mii: u32,
    pub mi: u32,
}

/// Fields of a newly created request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvaluationRequest {
    pub batch_id: DocId,
    pub initiated_by: DocId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub status: ProcessingStatus,
    pub frame_list: Vec<FrameListItem>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn progress_reads_snapshot_including_legacy_done() {
        let req: EvaluationRequest = serde_json::from_value(json!({
            "id": "r1",
            "batchId": "b1",
            "status": "processing",
            "frameList": [
                {"frameId": "f1", "frameURL": "b1/f1.jpg", "status": "done"},
                {"frameId": "f2", "frameURL": "b1/f2.jpg", "status": "failed"},
                {"frameId": "f3", "frameURL": "b1/f3.jpg", "status": "pending"}
            ]
        }))
        .unwrap();

        let progress = req.progress();
        assert_eq!(progress.total, 3);
        assert_eq!(progress.completed, 1);
        assert_eq!(progress.failed, 1);
    }
}
