//! Donor/recipient eligibility suggestion from aggregate maturity counts.
//!
//! The suggestion is advisory. `eligibilityStatus` only moves to
//! approved/rejected through an explicit human decision.

use serde::{Deserialize, Serialize};

use crate::maturity::Maturity;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// A donor is eligible when at least this share of frames is MII.
pub const DONOR_MII_THRESHOLD_PCT: f64 = 70.0;

/// A recipient is eligible when at least this share of frames is MI.
pub const RECIPIENT_MI_THRESHOLD_PCT: f64 = 90.0;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Patient role within the egg bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatientRole {
    Donor,
    Recipient,
}

/// System-suggested eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SuggestedEligibility {
    Eligible,
    NotEligible,
}

/// Human approval state of a suggestion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EligibilityStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl EligibilityStatus {
    /// Status resulting from an approve/reject decision.
    pub fn from_decision(approved: bool) -> Self {
        if approved {
            Self::Approved
        } else {
            Self::Rejected
        }
    }
}

/// MII/MI tallies over the frames of one batch.
///
/// `total` counts every frame, including frames without an evaluation, so
/// `mii + mi <= total` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaturityCounts {
    pub mii: u32,
    pub mi: u32,
    pub total: u32,
}

impl MaturityCounts {
    /// Tally a sequence of per-frame maturities (`None` = not evaluated).
    pub fn tally<I>(frames: I) -> Self
    where
        I: IntoIterator<Item = Option<Maturity>>,
    {
        let mut counts = Self::default();
        for maturity in frames {
            counts.total += 1;
            match maturity {
                Some(Maturity::Mii) => counts.mii += 1,
                Some(Maturity::Mi) => counts.mi += 1,
                None => {}
            }
        }
        counts
    }
}

/// Result of [`assess`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EligibilityAssessment {
    /// Percentage rounded to one decimal place.
    pub percentage: f64,
    pub suggested: SuggestedEligibility,
}

// ---------------------------------------------------------------------------
// Assessment
// ---------------------------------------------------------------------------

/// Compute the eligibility suggestion for a patient role.
///
/// Donors are scored on the MII share (>= 70%), recipients on the MI share
/// (>= 90%). The threshold is compared against the unrounded share.
/// Returns `None` when the batch has no frames.
pub fn assess(role: PatientRole, counts: MaturityCounts) -> Option<EligibilityAssessment> {
    if counts.total == 0 {
        return None;
    }

    let (numerator, threshold) = match role {
        PatientRole::Donor => (counts.mii, DONOR_MII_THRESHOLD_PCT),
        PatientRole::Recipient => (counts.mi, RECIPIENT_MI_THRESHOLD_PCT),
    };

    let raw = f64::from(numerator) / f64::from(counts.total) * 100.0;
    let suggested = if raw >= threshold {
        SuggestedEligibility::Eligible
    } else {
        SuggestedEligibility::NotEligible
    };

    Some(EligibilityAssessment {
        percentage: round_one_decimal(raw),
        suggested,
    })
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
