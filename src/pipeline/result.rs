//! Assembled capture result document
//!
//! The document persisted when a capture reaches `done`: measurement
//! snapshots, the nullable skin profile, a shape classification
//! placeholder, the quality block, and per-stage model version tags.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::measure::MeasurementSet;
use crate::skin::SkinProfile;

/// Measurement snapshots retained over a capture's life
///
/// `original` is the first computed set; `current` may later diverge
/// through external user adjustments. They are identical at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementSnapshots {
    pub original: MeasurementSet,
    pub current: MeasurementSet,
}

impl MeasurementSnapshots {
    /// Create snapshots from a freshly computed measurement set
    pub fn new(measurements: MeasurementSet) -> Self {
        Self {
            original: measurements.clone(),
            current: measurements,
        }
    }
}

/// Body shape classification placeholder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeClassification {
    #[serde(rename = "type")]
    pub kind: String,
    pub confidence: f32,
}

impl ShapeClassification {
    /// The placeholder emitted until a shape classifier exists
    pub fn unknown() -> Self {
        Self {
            kind: "unknown".to_string(),
            confidence: 0.0,
        }
    }
}

/// Quality block summarizing capture conditions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub lighting_ok: bool,
    pub card_detected: bool,
    pub overall_confidence: f32,
    pub warnings: Vec<String>,
}

/// Complete result document for one processed capture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureDocument {
    pub measurements: MeasurementSnapshots,
    pub skin: Option<SkinProfile>,
    pub shape: ShapeClassification,
    pub quality: QualityReport,
    /// Per-stage model version tags (pose, segmentation, regressor)
    pub model_versions: BTreeMap<String, String>,
}
