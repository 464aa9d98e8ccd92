//! Body measurements from pose keypoints
//!
//! Converts normalized keypoints into named physical measurements using
//! the pixels-per-cm scale from card detection. Widths for chest and waist
//! use fixed anthropometric ratios standing in for a trained regressor;
//! circumferences come from an elliptical cross-section approximation
//! behind the [`CircumferenceEstimator`] seam so a future model can
//! replace the heuristic without touching the pipeline.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::config::MeasurementConfig;
use crate::measure::landmarks::{Keypoint, KeypointSet, Landmark};
use crate::{PipelineError, Result};

/// Named body measurements, all in centimeters
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Measurement {
    #[serde(rename = "height_cm")]
    Height,
    #[serde(rename = "shoulder_width_cm")]
    ShoulderWidth,
    #[serde(rename = "torso_length_cm")]
    TorsoLength,
    #[serde(rename = "inseam_cm")]
    Inseam,
    #[serde(rename = "arm_length_cm")]
    ArmLength,
    #[serde(rename = "hip_width_cm")]
    HipWidth,
    #[serde(rename = "chest_width_cm")]
    ChestWidth,
    #[serde(rename = "waist_width_cm")]
    WaistWidth,
    #[serde(rename = "chest_circumference_cm")]
    ChestCircumference,
    #[serde(rename = "waist_circumference_cm")]
    WaistCircumference,
    #[serde(rename = "hip_circumference_cm")]
    HipCircumference,
    #[serde(rename = "neck_circumference_cm")]
    NeckCircumference,
}

/// Mapping of named measurement to physical length in cm
pub type MeasurementSet = BTreeMap<Measurement, f64>;

/// Landmarks whose visibility drives measurement confidence
const CONFIDENCE_LANDMARKS: [Landmark; 7] = [
    Landmark::Nose,
    Landmark::LeftShoulder,
    Landmark::RightShoulder,
    Landmark::LeftHip,
    Landmark::RightHip,
    Landmark::LeftAnkle,
    Landmark::RightAnkle,
];

/// Strategy for deriving circumferences from width measurements
///
/// Circumference fields are always derived, never directly observed.
pub trait CircumferenceEstimator: Send + Sync {
    /// Derive circumference entries from the width measurements present
    fn circumferences(&self, measurements: &MeasurementSet) -> MeasurementSet;

    /// Version tag recorded in the result document
    fn version(&self) -> String;
}

/// Elliptical cross-section circumference approximation
///
/// `C = pi * (w/2 + d/2)` with depth `d = depth_width_ratio * w` when no
/// side-view depth measurement exists.
pub struct EllipticalEstimator {
    depth_width_ratio: f64,
}

impl EllipticalEstimator {
    pub fn new(depth_width_ratio: f64) -> Self {
        Self { depth_width_ratio }
    }
}

impl CircumferenceEstimator for EllipticalEstimator {
    fn circumferences(&self, measurements: &MeasurementSet) -> MeasurementSet {
        let mut out = MeasurementSet::new();

        let pairs = [
            (Measurement::ChestWidth, Measurement::ChestCircumference),
            (Measurement::WaistWidth, Measurement::WaistCircumference),
            (Measurement::HipWidth, Measurement::HipCircumference),
        ];
        for (width_key, circ_key) in pairs {
            if let Some(width) = measurements.get(&width_key) {
                let depth = width * self.depth_width_ratio;
                out.insert(circ_key, ellipse_circumference(*width, depth));
            }
        }

        if let Some(shoulder) = measurements.get(&Measurement::ShoulderWidth) {
            out.insert(
                Measurement::NeckCircumference,
                shoulder * crate::constants::measurement::NECK_SHOULDER_RATIO,
            );
        }

        out
    }

    fn version(&self) -> String {
        "ellipse-approximation-v1".to_string()
    }
}

/// Ellipse circumference approximation `C = pi * (w/2 + d/2)`
///
/// Reduces to `C = pi * d` for a circular cross-section (w == d).
pub fn ellipse_circumference(width: f64, depth: f64) -> f64 {
    PI * (width / 2.0 + depth / 2.0)
}

/// Extracts named measurements from pose keypoints
pub struct MeasurementExtractor {
    config: MeasurementConfig,
    pixels_per_cm: f64,
}

impl MeasurementExtractor {
    /// Create an extractor with the given scale factor
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::InvalidParameter` for a non-positive scale.
    pub fn new(config: MeasurementConfig, pixels_per_cm: f64) -> Result<Self> {
        if pixels_per_cm <= 0.0 || !pixels_per_cm.is_finite() {
            return Err(PipelineError::InvalidParameter {
                parameter: "pixels_per_cm".into(),
                value: pixels_per_cm.to_string(),
            });
        }
        Ok(Self {
            config,
            pixels_per_cm,
        })
    }

    /// Extract all measurements from a keypoint set
    ///
    /// # Arguments
    ///
    /// * `keypoints` - Normalized 33-point pose keypoints
    /// * `image_width`, `image_height` - Pixel dimensions of the image the
    ///   keypoints refer to
    ///
    /// # Returns
    ///
    /// Width and length measurements in cm (circumferences are derived
    /// separately through a [`CircumferenceEstimator`])
    pub fn extract(
        &self,
        keypoints: &KeypointSet,
        image_width: u32,
        image_height: u32,
    ) -> MeasurementSet {
        let mut m = MeasurementSet::new();

        m.insert(Measurement::Height, self.height(keypoints, image_height));
        let shoulder = self.shoulder_width(keypoints, image_width, image_height);
        m.insert(Measurement::ShoulderWidth, shoulder);
        m.insert(
            Measurement::TorsoLength,
            self.torso_length(keypoints, image_height),
        );
        m.insert(
            Measurement::Inseam,
            self.px_distance(
                keypoints.get(Landmark::LeftHip),
                keypoints.get(Landmark::LeftAnkle),
                image_width,
                image_height,
            ) / self.pixels_per_cm,
        );
        m.insert(
            Measurement::ArmLength,
            self.arm_length(keypoints, image_width, image_height),
        );
        let hip = self.px_distance(
            keypoints.get(Landmark::LeftHip),
            keypoints.get(Landmark::RightHip),
            image_width,
            image_height,
        ) / self.pixels_per_cm;
        m.insert(Measurement::HipWidth, hip);

        // Fixed anthropometric ratios pending a trained regressor
        m.insert(
            Measurement::ChestWidth,
            shoulder * self.config.chest_shoulder_ratio,
        );
        m.insert(Measurement::WaistWidth, hip * self.config.waist_hip_ratio);

        log::info!(
            "Extracted measurements: height={:.1}cm",
            m.get(&Measurement::Height).copied().unwrap_or(0.0)
        );

        m
    }

    /// Confidence score from visibility of measurement-critical keypoints
    pub fn confidence(&self, keypoints: &KeypointSet) -> f32 {
        keypoints.mean_visibility(&CONFIDENCE_LANDMARKS)
    }

    /// Height from nose to ankle midpoint, corrected for the nose-to-crown
    /// offset
    fn height(&self, keypoints: &KeypointSet, image_height: u32) -> f64 {
        let nose = keypoints.get(Landmark::Nose);
        let left_ankle = keypoints.get(Landmark::LeftAnkle);
        let right_ankle = keypoints.get(Landmark::RightAnkle);

        let ankle_y = (left_ankle.y + right_ankle.y) as f64 / 2.0;
        let height_px = (ankle_y - nose.y as f64).abs() * image_height as f64;

        height_px * self.config.head_offset_factor / self.pixels_per_cm
    }

    fn shoulder_width(&self, keypoints: &KeypointSet, w: u32, h: u32) -> f64 {
        self.px_distance(
            keypoints.get(Landmark::LeftShoulder),
            keypoints.get(Landmark::RightShoulder),
            w,
            h,
        ) / self.pixels_per_cm
    }

    /// Vertical distance between the shoulder and hip midlines
    fn torso_length(&self, keypoints: &KeypointSet, image_height: u32) -> f64 {
        let shoulder_y = (keypoints.get(Landmark::LeftShoulder).y
            + keypoints.get(Landmark::RightShoulder).y) as f64
            / 2.0;
        let hip_y = (keypoints.get(Landmark::LeftHip).y + keypoints.get(Landmark::RightHip).y)
            as f64
            / 2.0;

        (hip_y - shoulder_y).abs() * image_height as f64 / self.pixels_per_cm
    }

    /// Upper arm plus forearm length along the left side
    fn arm_length(&self, keypoints: &KeypointSet, w: u32, h: u32) -> f64 {
        let upper = self.px_distance(
            keypoints.get(Landmark::LeftShoulder),
            keypoints.get(Landmark::LeftElbow),
            w,
            h,
        );
        let forearm = self.px_distance(
            keypoints.get(Landmark::LeftElbow),
            keypoints.get(Landmark::LeftWrist),
            w,
            h,
        );
        (upper + forearm) / self.pixels_per_cm
    }

    /// Euclidean distance between two keypoints in pixels
    fn px_distance(&self, a: Keypoint, b: Keypoint, image_width: u32, image_height: u32) -> f64 {
        let dx = (a.x - b.x) as f64 * image_width as f64;
        let dy = (a.y - b.y) as f64 * image_height as f64;
        (dx * dx + dy * dy).sqrt()
    }
}
