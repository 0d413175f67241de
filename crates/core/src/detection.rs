//! Detection types produced by the object-detection model.
//!
//! The model is trained on four raw labels. One of them, `Polar-Body`, is an
//! annotation artefact of the source image and is NOT a clinically
//! meaningful polar body; it is remapped to [`DetectionClass::PolarBodyAnnotation`]
//! so the maturity rule can never confuse it with [`DetectionClass::PolarBody`].

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Raw model labels
// ---------------------------------------------------------------------------

/// Raw class labels in model output order (index = class id).
pub const MODEL_CLASS_NAMES: [&str; 4] = ["Polar-Body", "cytoplasm", "oocyte", "polarbody"];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Normalized detection class as persisted in `detectionResults`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetectionClass {
    #[serde(rename = "oocyte")]
    Oocyte,
    /// The actual polar body. Only this class counts towards MII.
    #[serde(rename = "polarbody")]
    PolarBody,
    /// Source-image annotation that looks like a polar body but is not one.
    #[serde(rename = "polar-body")]
    PolarBodyAnnotation,
    #[serde(rename = "cytoplasm")]
    Cytoplasm,
    #[serde(rename = "pb")]
    Pb,
    /// Any label this build does not recognise.
    #[serde(other, rename = "unknown")]
    Unknown,
}

impl DetectionClass {
    /// Normalize a raw model label.
    ///
    /// `Polar-Body` maps to [`DetectionClass::PolarBodyAnnotation`]; every
    /// other label is matched case-insensitively.
    pub fn from_model_label(label: &str) -> Self {
        if label == "Polar-Body" {
            return Self::PolarBodyAnnotation;
        }
        match label.to_ascii_lowercase().as_str() {
            "oocyte" => Self::Oocyte,
            "polarbody" => Self::PolarBody,
            "polar-body" => Self::PolarBodyAnnotation,
            "cytoplasm" => Self::Cytoplasm,
            "pb" => Self::Pb,
            _ => Self::Unknown,
        }
    }

    /// Normalize a model class id using [`MODEL_CLASS_NAMES`].
    pub fn from_class_id(class_id: usize) -> Self {
        MODEL_CLASS_NAMES
            .get(class_id)
            .map(|label| Self::from_model_label(label))
            .unwrap_or(Self::Unknown)
    }
}

/// Axis-aligned bounding box in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

/// One detected structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "class")]
    pub class: DetectionClass,
    pub confidence: f64,
    pub bbox: BoundingBox,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
