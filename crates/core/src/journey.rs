//! Patient journey stages.
//!
//! Stages only move forward. Requests to move to an earlier or equal stage
//! are no-ops.

use serde::{Deserialize, Serialize};

/// Ordered patient journey stages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JourneyStage {
    #[default]
    Registration,
    MedicalHistory,
    Appointment,
    Retrieval,
    Eligibility,
}

impl JourneyStage {
    /// All stages in journey order.
    pub const ALL: [JourneyStage; 5] = [
        JourneyStage::Registration,
        JourneyStage::MedicalHistory,
        JourneyStage::Appointment,
        JourneyStage::Retrieval,
        JourneyStage::Eligibility,
    ];

    /// Return `target` if it lies strictly after `self`, otherwise `None`.
    pub fn advance_to(self, target: JourneyStage) -> Option<JourneyStage> {
        (target > self).then_some(target)
    }
}
