//! Egg records: per-batch MII/MI counts owned by the eligibility aggregator.

use eggbank_core::eligibility::{EligibilityStatus, SuggestedEligibility};
use eggbank_core::types::{DocId, Timestamp};
use serde::{Deserialize, Serialize};

/// A record from the `eggRecords` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EggRecord {
    pub id: DocId,
    pub patient_id: DocId,
    pub batch_id: DocId,
    #[serde(default)]
    pub mii_eggs: u32,
    #[serde(default)]
    pub mi_eggs: u32,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub suggested_eligibility: Option<SuggestedEligibility>,
    #[serde(default)]
    pub eligibility_status: EligibilityStatus,
    #[serde(default)]
    pub approved_by: Option<DocId>,
    #[serde(default, with = "crate::timestamp::optional")]
    pub approved_at: Option<Timestamp>,
    #[serde(default, with = "crate::timestamp::optional")]
    pub created_at: Option<Timestamp>,
    #[serde(default, with = "crate::timestamp::optional")]
    pub updated_at: Option<Timestamp>,
}

/// Fields of a newly created egg record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEggRecord {
    pub patient_id: DocId,
    pub batch_id: DocId,
    pub mii_eggs: u32,
    pub mi_eggs: u32,
    pub total: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_eligibility: Option<SuggestedEligibility>,
    pub eligibility_status: EligibilityStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
