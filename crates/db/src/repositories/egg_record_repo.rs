//! Repository for the `eggRecords` collection.

use eggbank_core::eligibility::{EligibilityStatus, MaturityCounts, SuggestedEligibility};
use eggbank_core::types::{DocId, Timestamp};
use serde_json::json;

use crate::error::StoreError;
use crate::models::egg_record::{EggRecord, NewEggRecord};
use crate::store::{encode, patch, DocumentStore, Filter, EGG_RECORDS};

/// Typed access to egg records. One record per batch is maintained.
pub struct EggRecordRepo;

impl EggRecordRepo {
    /// The record of a batch, oldest first if duplicates exist.
    pub async fn find_by_batch(
        store: &dyn DocumentStore,
        batch_id: &str,
    ) -> Result<Option<EggRecord>, StoreError> {
        store
            .query(EGG_RECORDS, Some(Filter::eq("batchId", batch_id)))
            .await?
            .first()
            .map(|doc| doc.decode())
            .transpose()
    }

    /// Update the counts of the batch's record, creating it if missing.
    /// Returns the record id.
    pub async fn upsert_counts(
        store: &dyn DocumentStore,
        patient_id: &str,
        batch_id: &str,
        counts: MaturityCounts,
        suggested: Option<SuggestedEligibility>,
        now: Timestamp,
    ) -> Result<DocId, StoreError> {
        if let Some(existing) = Self::find_by_batch(store, batch_id).await? {
            let mut fields = patch(json!({
                "miiEggs": counts.mii,
                "miEggs": counts.mi,
                "total": counts.total,
                "eligibilityStatus": EligibilityStatus::Pending,
                "updatedAt": now,
            }));
            if let Some(suggested) = suggested {
                fields.insert("suggestedEligibility".to_string(), json!(suggested));
            }
            store.update(EGG_RECORDS, &existing.id, fields).await?;
            return Ok(existing.id);
        }

        let record = NewEggRecord {
            patient_id: patient_id.to_string(),
            batch_id: batch_id.to_string(),
            mii_eggs: counts.mii,
            mi_eggs: counts.mi,
            total: counts.total,
            suggested_eligibility: suggested,
            eligibility_status: EligibilityStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        store.create(EGG_RECORDS, encode(&record)?).await
    }

    /// Mirror a human approval decision onto the record.
    pub async fn record_decision(
        store: &dyn DocumentStore,
        id: &str,
        status: EligibilityStatus,
        approved_by: &str,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let fields = patch(json!({
            "eligibilityStatus": status,
            "approvedBy": approved_by,
            "approvedAt": now,
            "updatedAt": now,
        }));
        store.update(EGG_RECORDS, id, fields).await
    }

    pub async fn delete(store: &dyn DocumentStore, id: &str) -> Result<bool, StoreError> {
        store.delete(EGG_RECORDS, id).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
