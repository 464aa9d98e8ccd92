//! Body measurement module
//!
//! This module converts externally-produced pose keypoints into named
//! physical measurements using the pixels-per-cm scale from card
//! detection, and approximates circumferences from widths.

pub mod body;
pub mod landmarks;

pub use body::{
    CircumferenceEstimator, EllipticalEstimator, Measurement, MeasurementExtractor,
    MeasurementSet,
};
pub use landmarks::{Keypoint, KeypointSet, Landmark, LANDMARK_COUNT};
