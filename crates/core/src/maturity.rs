//! Rule-based maturity classification.
//!
//! An oocyte with a detected polar body is mature (MII). Everything else,
//! including frames where no oocyte was detected at all, is classified
//! immature (MI). Missing oocytes are not an error at this layer.

use serde::{Deserialize, Serialize};

use crate::detection::{Detection, DetectionClass};

/// Oocyte maturity class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Maturity {
    /// Mature: polar body present.
    #[serde(rename = "MII")]
    Mii,
    /// Immature.
    #[serde(rename = "MI")]
    Mi,
}

/// Human-facing quality label paired with a maturity class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quality {
    #[serde(rename = "likely reproducible")]
    LikelyReproducible,
    #[serde(rename = "unlikely reproducible")]
    UnlikelyReproducible,
}

/// Output of [`classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub maturity: Maturity,
    pub quality: Quality,
}

impl Classification {
    const MATURE: Self = Self {
        maturity: Maturity::Mii,
        quality: Quality::LikelyReproducible,
    };

    const IMMATURE: Self = Self {
        maturity: Maturity::Mi,
        quality: Quality::UnlikelyReproducible,
    };
}

/// Classify a frame from its detections.
///
/// Only [`DetectionClass::PolarBody`] satisfies the polar-body condition;
/// [`DetectionClass::PolarBodyAnnotation`] is ignored.
pub fn classify(detections: &[Detection]) -> Classification {
    let has_oocyte = detections.iter().any(|d| d.class == DetectionClass::Oocyte);
    let has_polar_body = detections
        .iter()
        .any(|d| d.class == DetectionClass::PolarBody);

    if has_oocyte && has_polar_body {
        Classification::MATURE
    } else {
        Classification::IMMATURE
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
