//! External collaborator contracts
//!
//! Object storage, job persistence, result persistence, and the pose and
//! segmentation inference services are external to this crate. They are
//! modeled as traits so the orchestrator can be driven by real services in
//! production and in-memory doubles in tests. Inference handles are
//! produced per job by an explicit factory, giving each worker isolated
//! model state with clear ownership and teardown.

use opencv::core::Mat;
use serde::{Deserialize, Serialize};

use crate::measure::KeypointSet;
use crate::pipeline::job::CaptureJob;
use crate::pipeline::result::CaptureDocument;
use crate::Result;

/// The camera views a capture may include
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageView {
    Front,
    Side,
    Portrait,
    Reference,
}

impl ImageView {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageView::Front => "front",
            ImageView::Side => "side",
            ImageView::Portrait => "portrait",
            ImageView::Reference => "reference",
        }
    }
}

impl std::fmt::Display for ImageView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Object storage holding the capture's raw images
pub trait ImageStore: Send + Sync {
    /// Fetch the encoded bytes of one view, `None` when the view was not
    /// uploaded
    fn fetch(&self, capture_id: &str, view: ImageView) -> Result<Option<Vec<u8>>>;
}

/// External pose estimation service
///
/// The only contract with this crate is image in, keypoints out.
pub trait PoseModel {
    /// Detect the 33-point pose, `None` when no person was found
    fn keypoints(&self, image: &Mat) -> Result<Option<KeypointSet>>;

    /// Model version tag recorded in the result document
    fn version(&self) -> String;
}

/// External person/skin segmentation service
pub trait SegmentationModel {
    /// Produce a same-resolution binary mask, `None` when no person was
    /// found
    fn person_mask(&self, image: &Mat) -> Result<Option<Mat>>;

    /// Model version tag recorded in the result document
    fn version(&self) -> String;
}

/// Factory constructing fresh inference handles per job
pub trait InferenceFactory: Send + Sync {
    fn pose_model(&self) -> Result<Box<dyn PoseModel>>;
    fn segmentation_model(&self) -> Result<Box<dyn SegmentationModel>>;
}

/// Persistence for capture job state
pub trait JobStore: Send + Sync {
    /// Load a job by capture id, `None` when unknown
    fn load(&self, capture_id: &str) -> Result<Option<CaptureJob>>;

    /// Save the job's current state
    fn save(&self, job: &CaptureJob) -> Result<()>;
}

/// Persistence for the assembled result document
pub trait MetricsSink: Send + Sync {
    fn persist(&self, capture_id: &str, document: &CaptureDocument) -> Result<()>;
}
