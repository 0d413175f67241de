//! Processing status values and the derivation rules shared by the batch
//! processor (write side) and the status reporter (read side).

use serde::{Deserialize, Serialize};

/// Lifecycle status used by evaluation requests, retrieval batches and
/// per-frame entries of an evaluation request's frame list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    #[default]
    Pending,
    Processing,
    /// Older frame lists recorded finished frames as `"done"`.
    #[serde(alias = "done")]
    Completed,
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Batch outcome (write side)
// ---------------------------------------------------------------------------

/// Counters kept while a batch is processed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchTally {
    /// Frames skipped because they already carried detection results.
    pub processed: u32,
    pub success: u32,
    pub failed: u32,
}

impl BatchTally {
    /// Terminal status implied by the counters.
    ///
    /// Partial success is reported `completed`; failures stay visible per
    /// frame. Returns `None` when nothing was attempted, in which case the
    /// stored status must be left unchanged.
    pub fn outcome(&self) -> Option<ProcessingStatus> {
        match (self.success, self.failed) {
            (0, 0) => None,
            (0, _) => Some(ProcessingStatus::Failed),
            _ => Some(ProcessingStatus::Completed),
        }
    }
}

// ---------------------------------------------------------------------------
// Progress (read side)
// ---------------------------------------------------------------------------

/// Frame totals used to report progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameProgress {
    pub total: u32,
    pub completed: u32,
    pub failed: u32,
}

impl FrameProgress {
    /// Count a sequence of per-frame statuses.
    pub fn from_statuses<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = ProcessingStatus>,
    {
        let mut progress = Self::default();
        for status in statuses {
            progress.total += 1;
            match status {
                ProcessingStatus::Completed => progress.completed += 1,
                ProcessingStatus::Failed => progress.failed += 1,
                ProcessingStatus::Pending | ProcessingStatus::Processing => {}
            }
        }
        progress
    }

    /// Fraction of frames processed in `0.0..=1.0`. Failed frames count as
    /// processed.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        f64::from(self.completed + self.failed) / f64::from(self.total)
    }

    /// Reconcile a stored request status with live frame counts.
    ///
    /// An explicit `failed` is authoritative. Anything else is re-derived
    /// from the completed count alone.
    pub fn derive_status(&self, stored: ProcessingStatus) -> ProcessingStatus {
        if stored == ProcessingStatus::Failed {
            return ProcessingStatus::Failed;
        }
        if self.total == 0 || self.completed == 0 {
            ProcessingStatus::Pending
        } else if self.completed < self.total {
            ProcessingStatus::Processing
        } else {
            ProcessingStatus::Completed
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn tally(success: u32, failed: u32) -> BatchTally {
        BatchTally {
            processed: 0,
            success,
            failed,
        }
    }

    // -- BatchTally::outcome ------------------------------------------------

    #[test]
    fn all_success_is_completed() {
        assert_eq!(tally(3, 0).outcome(), Some(ProcessingStatus::Completed));
    }

    #[test]
    fn all_failed_is_failed() {
        assert_eq!(tally(0, 2).outcome(), Some(ProcessingStatus::Failed));
    }

    #[test]
    fn partial_success_is_completed() {
        assert_eq!(tally(2, 1).outcome(), Some(ProcessingStatus::Completed));
    }

    #[test]
    fn nothing_attempted_leaves_status_unchanged() {
        let t = BatchTally {
            processed: 4,
            success: 0,
            failed: 0,
        };
        assert_eq!(t.outcome(), None);
    }

    // -- FrameProgress ------------------------------------------------------

    #[test]
    fn progress_counts_failed_as_processed() {
        let p = FrameProgress::from_statuses([
            ProcessingStatus::Completed,
            ProcessingStatus::Failed,
            ProcessingStatus::Pending,
            ProcessingStatus::Completed,
        ]);
        assert_eq!(p.total, 4);
        assert_eq!(p.completed, 2);
        assert_eq!(p.failed, 1);
        assert!((p.fraction() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_progress_is_zero_and_pending() {
        let p = FrameProgress::default();
        assert_eq!(p.fraction(), 0.0);
        assert_eq!(
            p.derive_status(ProcessingStatus::Completed),
            ProcessingStatus::Pending
        );
    }

    #[test]
    fn explicit_failed_is_kept() {
        let p = FrameProgress {
            total: 2,
            completed: 2,
            failed: 0,
        };
        assert_eq!(p.derive_status(ProcessingStatus::Failed), ProcessingStatus::Failed);
    }

    #[test]
    fn derived_status_follows_completed_count() {
        let partial = FrameProgress {
            total: 3,
            completed: 1,
            failed: 1,
        };
        assert_eq!(
            partial.derive_status(ProcessingStatus::Completed),
            ProcessingStatus::Processing
        );

        let done = FrameProgress {
            total: 3,
            completed: 3,
            failed: 0,
        };
        assert_eq!(
            done.derive_status(ProcessingStatus::Processing),
            ProcessingStatus::Completed
        );
    }

    #[test]
    fn legacy_done_deserializes_as_completed() {
        let s: ProcessingStatus = serde_json::from_str("\"done\"").unwrap();
        assert_eq!(s, ProcessingStatus::Completed);
    }
}
