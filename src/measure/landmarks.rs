//! Pose landmark layout and keypoint containers
//!
//! Keypoints follow the fixed 33-point MediaPipe Pose layout. They are
//! produced by an external pose estimation service and are read-only to
//! this crate.

use serde::{Deserialize, Serialize};

use crate::{PipelineError, Result};

/// Number of landmarks in the pose layout
pub const LANDMARK_COUNT: usize = 33;

/// Named landmarks of the 33-point pose layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Landmark {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl Landmark {
    /// Index of this landmark in the keypoint array
    pub fn index(self) -> usize {
        self as usize
    }
}

/// One pose keypoint in normalized image coordinates
///
/// `x` and `y` are normalized to the image dimensions, `z` is depth
/// relative to the hips, `visibility` is the estimator's confidence that
/// the landmark is visible.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub visibility: f32,
}

impl Keypoint {
    /// Create a keypoint with zero depth
    pub fn new(x: f32, y: f32, visibility: f32) -> Self {
        Self {
            x,
            y,
            z: 0.0,
            visibility,
        }
    }
}

/// Fixed-length keypoint array indexed by [`Landmark`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeypointSet(Vec<Keypoint>);

impl KeypointSet {
    /// Build a keypoint set from a full 33-point array
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::InvalidParameter` when the array does not
    /// contain exactly 33 keypoints.
    pub fn from_vec(keypoints: Vec<Keypoint>) -> Result<Self> {
        if keypoints.len() != LANDMARK_COUNT {
            return Err(PipelineError::InvalidParameter {
                parameter: "keypoints".into(),
                value: format!("{} entries (expected {})", keypoints.len(), LANDMARK_COUNT),
            });
        }
        Ok(Self(keypoints))
    }

    /// Get a keypoint by landmark name
    pub fn get(&self, landmark: Landmark) -> Keypoint {
        self.0[landmark.index()]
    }

    /// All keypoints in layout order
    pub fn as_slice(&self) -> &[Keypoint] {
        &self.0
    }

    /// Mean visibility over the given landmarks
    pub fn mean_visibility(&self, landmarks: &[Landmark]) -> f32 {
        if landmarks.is_empty() {
            return 0.0;
        }
        let sum: f32 = landmarks.iter().map(|l| self.get(*l).visibility).sum();
        sum / landmarks.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_set(visibility: f32) -> KeypointSet {
        KeypointSet::from_vec(vec![Keypoint::new(0.5, 0.5, visibility); LANDMARK_COUNT])
            .unwrap()
    }

    #[test]
    fn test_landmark_indices_match_layout() {
        assert_eq!(Landmark::Nose.index(), 0);
        assert_eq!(Landmark::LeftShoulder.index(), 11);
        assert_eq!(Landmark::RightHip.index(), 24);
        assert_eq!(Landmark::RightFootIndex.index(), 32);
    }

    #[test]
    fn test_from_vec_rejects_wrong_length() {
        let result = KeypointSet::from_vec(vec![Keypoint::new(0.0, 0.0, 1.0); 17]);
        assert!(matches!(
            result,
            Err(PipelineError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_mean_visibility() {
        let set = uniform_set(0.8);
        let vis = set.mean_visibility(&[Landmark::Nose, Landmark::LeftAnkle]);
        assert!((vis - 0.8).abs() < 1e-6);
    }
}
