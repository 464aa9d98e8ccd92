//! Integration tests for the complete capture processing pipeline
//!
//! These tests drive the orchestrator end to end with in-memory
//! collaborator doubles: an image store backed by encoded PNG fixtures,
//! a job store and metrics sink backed by hash maps, and stub pose and
//! segmentation models.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use opencv::core::{Mat, Scalar, CV_8UC1};
use opencv::prelude::*;

use fitscan::measure::{Keypoint, KeypointSet, Landmark, Measurement, LANDMARK_COUNT};
use fitscan::pipeline::{
    CaptureDocument, ImageStore, ImageView, InferenceFactory, JobStore, MetricsSink,
    PoseModel, SegmentationModel,
};
use fitscan::skin::{Season, Undertone};
use fitscan::{CaptureJob, CaptureStatus, Orchestrator, PipelineConfig, PipelineError};

// ============================================================================
// Collaborator Doubles
// ============================================================================

#[derive(Default)]
struct MemoryImageStore {
    images: HashMap<ImageView, Vec<u8>>,
    fail_fetch: bool,
}

impl ImageStore for MemoryImageStore {
    fn fetch(&self, _capture_id: &str, view: ImageView) -> fitscan::Result<Option<Vec<u8>>> {
        if self.fail_fetch {
            return Err(PipelineError::Storage {
                message: "simulated object store outage".into(),
                source: None,
            });
        }
        Ok(self.images.get(&view).cloned())
    }
}

#[derive(Default)]
struct MemoryJobStore {
    jobs: Mutex<HashMap<String, CaptureJob>>,
}

impl MemoryJobStore {
    fn seed(&self, capture_id: &str) {
        self.jobs
            .lock()
            .unwrap()
            .insert(capture_id.to_string(), CaptureJob::new(capture_id));
    }

    fn job(&self, capture_id: &str) -> CaptureJob {
        self.jobs.lock().unwrap().get(capture_id).cloned().unwrap()
    }
}

impl JobStore for MemoryJobStore {
    fn load(&self, capture_id: &str) -> fitscan::Result<Option<CaptureJob>> {
        Ok(self.jobs.lock().unwrap().get(capture_id).cloned())
    }

    fn save(&self, job: &CaptureJob) -> fitscan::Result<()> {
        self.jobs
            .lock()
            .unwrap()
            .insert(job.capture_id.clone(), job.clone());
        Ok(())
    }
}

#[derive(Default)]
struct MemoryMetricsSink {
    documents: Mutex<HashMap<String, CaptureDocument>>,
}

impl MemoryMetricsSink {
    fn document(&self, capture_id: &str) -> Option<CaptureDocument> {
        self.documents.lock().unwrap().get(capture_id).cloned()
    }
}

impl MetricsSink for MemoryMetricsSink {
    fn persist(&self, capture_id: &str, document: &CaptureDocument) -> fitscan::Result<()> {
        self.documents
            .lock()
            .unwrap()
            .insert(capture_id.to_string(), document.clone());
        Ok(())
    }
}

struct StubPoseModel {
    keypoints: Option<KeypointSet>,
}

impl PoseModel for StubPoseModel {
    fn keypoints(&self, _image: &Mat) -> fitscan::Result<Option<KeypointSet>> {
        Ok(self.keypoints.clone())
    }

    fn version(&self) -> String {
        "stub-pose-v1".to_string()
    }
}

struct StubSegmentationModel;

impl SegmentationModel for StubSegmentationModel {
    fn person_mask(&self, image: &Mat) -> fitscan::Result<Option<Mat>> {
        let mask = Mat::new_rows_cols_with_default(
            image.rows(),
            image.cols(),
            CV_8UC1,
            Scalar::all(255.0),
        )
        .map_err(|e| PipelineError::opencv("mask creation", e))?;
        Ok(Some(mask))
    }

    fn version(&self) -> String {
        "stub-segmentation-v1".to_string()
    }
}

struct StubInferenceFactory {
    keypoints: Option<KeypointSet>,
}

impl InferenceFactory for StubInferenceFactory {
    fn pose_model(&self) -> fitscan::Result<Box<dyn PoseModel>> {
        Ok(Box::new(StubPoseModel {
            keypoints: self.keypoints.clone(),
        }))
    }

    fn segmentation_model(&self) -> fitscan::Result<Box<dyn SegmentationModel>> {
        Ok(Box::new(StubSegmentationModel))
    }
}

struct FailingPoseModel;

impl PoseModel for FailingPoseModel {
    fn keypoints(&self, _image: &Mat) -> fitscan::Result<Option<KeypointSet>> {
        Err(PipelineError::Inference {
            service: "pose".to_string(),
            message: "connection refused".to_string(),
        })
    }

    fn version(&self) -> String {
        "stub-pose-v1".to_string()
    }
}

struct FailingPoseFactory;

impl InferenceFactory for FailingPoseFactory {
    fn pose_model(&self) -> fitscan::Result<Box<dyn PoseModel>> {
        Ok(Box::new(FailingPoseModel))
    }

    fn segmentation_model(&self) -> fitscan::Result<Box<dyn SegmentationModel>> {
        Ok(Box::new(StubSegmentationModel))
    }
}

// ============================================================================
// Fixtures
// ============================================================================

fn encode_png(img: &image::RgbImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    img.write_to(
        &mut std::io::Cursor::new(&mut bytes),
        image::ImageFormat::Png,
    )
    .unwrap();
    bytes
}

/// Uniform gray front view, 500x1000 px
fn front_fixture() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(500, 1000, image::Rgb([128, 128, 128]));
    encode_png(&img)
}

/// Reference image: a 340x220 px card carrying the six reference patch
/// colors as vertical bands, on a black background. Aspect matches the
/// physical 8.5x5.5 cm card, so the scale comes out near 40 px/cm.
fn reference_fixture() -> Vec<u8> {
    const PATCH_RGB: [[u8; 3]; 6] = [
        [115, 82, 68],
        [194, 150, 130],
        [98, 122, 157],
        [87, 108, 67],
        [133, 128, 177],
        [103, 189, 170],
    ];

    let mut img = image::RgbImage::from_pixel(640, 480, image::Rgb([0, 0, 0]));
    let (card_x, card_y, card_w, card_h) = (150u32, 130u32, 340u32, 220u32);
    let band_w = card_w / 6;

    for y in card_y..card_y + card_h {
        for x in card_x..card_x + card_w {
            let band = (((x - card_x) / band_w) as usize).min(5);
            img.put_pixel(x, y, image::Rgb(PATCH_RGB[band]));
        }
    }

    encode_png(&img)
}

/// Uniform light-skin portrait, 400x400 px, RGB (194, 150, 130)
fn portrait_fixture() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(400, 400, image::Rgb([194, 150, 130]));
    encode_png(&img)
}

/// Keypoints at canonical proportions of a 170 cm figure for a 1000 px
/// tall image at 10 px/cm
fn canonical_keypoints() -> KeypointSet {
    let mut kps = vec![Keypoint::new(0.5, 0.5, 0.9); LANDMARK_COUNT];

    let nose_y = 0.1;
    let ankle_y = nose_y + 170.0 * 10.0 / (1000.0 * 1.1);

    kps[Landmark::Nose.index()] = Keypoint::new(0.5, nose_y, 0.95);
    kps[Landmark::LeftShoulder.index()] = Keypoint::new(0.3, 0.35, 0.95);
    kps[Landmark::RightShoulder.index()] = Keypoint::new(0.7, 0.35, 0.95);
    kps[Landmark::LeftElbow.index()] = Keypoint::new(0.25, 0.65, 0.9);
    kps[Landmark::LeftWrist.index()] = Keypoint::new(0.22, 0.95, 0.85);
    kps[Landmark::LeftHip.index()] = Keypoint::new(0.38, 0.85, 0.95);
    kps[Landmark::RightHip.index()] = Keypoint::new(0.62, 0.85, 0.95);
    kps[Landmark::LeftAnkle.index()] = Keypoint::new(0.4, ankle_y as f32, 0.85);
    kps[Landmark::RightAnkle.index()] = Keypoint::new(0.6, ankle_y as f32, 0.85);

    KeypointSet::from_vec(kps).unwrap()
}

fn fast_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.retry.backoff_secs = 0;
    config
}

struct Harness {
    orchestrator: Orchestrator,
    jobs: Arc<MemoryJobStore>,
    metrics: Arc<MemoryMetricsSink>,
}

fn harness(images: MemoryImageStore, keypoints: Option<KeypointSet>) -> Harness {
    let jobs = Arc::new(MemoryJobStore::default());
    let metrics = Arc::new(MemoryMetricsSink::default());
    let orchestrator = Orchestrator::new(
        fast_config(),
        Arc::new(images),
        jobs.clone(),
        metrics.clone(),
        Arc::new(StubInferenceFactory { keypoints }),
    );
    Harness {
        orchestrator,
        jobs,
        metrics,
    }
}

// ============================================================================
// Full Pipeline
// ============================================================================

#[test]
fn test_full_pipeline_with_reference_card() {
    let mut store = MemoryImageStore::default();
    store.images.insert(ImageView::Front, front_fixture());
    store.images.insert(ImageView::Reference, reference_fixture());
    store.images.insert(ImageView::Portrait, portrait_fixture());

    let h = harness(store, Some(canonical_keypoints()));
    h.jobs.seed("cap-card");

    let job = h.orchestrator.process("cap-card").unwrap();
    assert_eq!(job.status, CaptureStatus::Done);
    assert_eq!(job.attempts, 1);
    assert!(job.processing_started_at.is_some());
    assert!(job.processing_completed_at.is_some());

    let document = h.metrics.document("cap-card").expect("document persisted");
    assert!(document.quality.card_detected);
    assert!(document.quality.lighting_ok);

    // Snapshots are identical at creation and contain derived circumferences
    assert_eq!(document.measurements.original, document.measurements.current);
    let measurements = &document.measurements.current;
    assert!(measurements[&Measurement::Height] > 0.0);
    assert!(measurements.contains_key(&Measurement::ChestCircumference));
    assert!(measurements.contains_key(&Measurement::WaistCircumference));
    assert!(measurements.contains_key(&Measurement::HipCircumference));

    // Card-calibrated skin profile on a warm light-skin portrait
    let skin = document.skin.as_ref().expect("skin profile present");
    assert!(skin.calibrated);
    assert_eq!(skin.undertone, Undertone::Warm);
    assert_eq!(skin.season, Season::Spring);
    assert!(!skin.palette.is_empty());
    assert!(!skin.avoid_colors.is_empty());

    assert_eq!(
        document.model_versions.get("pose").map(String::as_str),
        Some("stub-pose-v1")
    );
}

#[test]
fn test_height_from_canonical_figure() {
    // Scenario: canonical 170 cm proportions, default 10 px/cm scale,
    // 1000 px tall front image
    let mut store = MemoryImageStore::default();
    store.images.insert(ImageView::Front, front_fixture());

    let h = harness(store, Some(canonical_keypoints()));
    h.jobs.seed("cap-height");

    let job = h.orchestrator.process("cap-height").unwrap();
    assert_eq!(job.status, CaptureStatus::Done);

    let document = h.metrics.document("cap-height").unwrap();
    let height = document.measurements.current[&Measurement::Height];
    assert!(
        (height - 170.0).abs() < 2.0,
        "height {height} not within 2cm of 170"
    );
}

// ============================================================================
// Fallback Paths
// ============================================================================

#[test]
fn test_no_reference_card_falls_back_to_gray_world() {
    // Scenario: no reference image at all
    let mut store = MemoryImageStore::default();
    store.images.insert(ImageView::Front, front_fixture());
    store.images.insert(ImageView::Portrait, portrait_fixture());

    let h = harness(store, Some(canonical_keypoints()));
    h.jobs.seed("cap-nocard");

    let job = h.orchestrator.process("cap-nocard").unwrap();
    assert_eq!(job.status, CaptureStatus::Done);

    let document = h.metrics.document("cap-nocard").unwrap();
    assert!(!document.quality.card_detected);
    assert!(
        document
            .quality
            .warnings
            .iter()
            .any(|w| w.contains("default scale")),
        "warnings: {:?}",
        document.quality.warnings
    );

    // Default 10 px/cm scale applied: canonical figure reproduces 170 cm
    let height = document.measurements.current[&Measurement::Height];
    assert!((height - 170.0).abs() < 2.0);

    // Skin profile exists but was not card-calibrated
    let skin = document.skin.as_ref().unwrap();
    assert!(!skin.calibrated);
}

#[test]
fn test_undetectable_card_records_warning() {
    // A reference image with no card in it (uniform black)
    let mut store = MemoryImageStore::default();
    store.images.insert(ImageView::Front, front_fixture());
    store.images.insert(
        ImageView::Reference,
        encode_png(&image::RgbImage::from_pixel(640, 480, image::Rgb([0, 0, 0]))),
    );

    let h = harness(store, Some(canonical_keypoints()));
    h.jobs.seed("cap-blankref");

    let job = h.orchestrator.process("cap-blankref").unwrap();
    assert_eq!(job.status, CaptureStatus::Done);

    let document = h.metrics.document("cap-blankref").unwrap();
    assert!(!document.quality.card_detected);
    assert!(document
        .quality
        .warnings
        .iter()
        .any(|w| w.contains("not detected")));
}

#[test]
fn test_missing_pose_skips_measurements() {
    let mut store = MemoryImageStore::default();
    store.images.insert(ImageView::Front, front_fixture());

    let h = harness(store, None);
    h.jobs.seed("cap-nopose");

    let job = h.orchestrator.process("cap-nopose").unwrap();
    assert_eq!(job.status, CaptureStatus::Done);

    let document = h.metrics.document("cap-nopose").unwrap();
    assert!(document.measurements.current.is_empty());
    assert_eq!(document.quality.overall_confidence, 0.0);
    assert!(document
        .quality
        .warnings
        .iter()
        .any(|w| w.contains("No pose detected")));
}

#[test]
fn test_missing_portrait_yields_null_skin() {
    let mut store = MemoryImageStore::default();
    store.images.insert(ImageView::Front, front_fixture());

    let h = harness(store, Some(canonical_keypoints()));
    h.jobs.seed("cap-noskin");

    let job = h.orchestrator.process("cap-noskin").unwrap();
    assert_eq!(job.status, CaptureStatus::Done);

    let document = h.metrics.document("cap-noskin").unwrap();
    assert!(document.skin.is_none());
    assert!(document
        .quality
        .warnings
        .iter()
        .any(|w| w.contains("skin analysis skipped")));
}

#[test]
fn test_pose_service_outage_is_soft() {
    let mut store = MemoryImageStore::default();
    store.images.insert(ImageView::Front, front_fixture());

    let jobs = Arc::new(MemoryJobStore::default());
    let metrics = Arc::new(MemoryMetricsSink::default());
    let orchestrator = Orchestrator::new(
        fast_config(),
        Arc::new(store),
        jobs.clone(),
        metrics.clone(),
        Arc::new(FailingPoseFactory),
    );

    jobs.seed("cap-posedown");
    let job = orchestrator.process("cap-posedown").unwrap();

    // An inference transport failure degrades the result, it does not
    // fail the capture
    assert_eq!(job.status, CaptureStatus::Done);
    let document = metrics.document("cap-posedown").unwrap();
    assert!(document.measurements.current.is_empty());
    assert!(document
        .quality
        .warnings
        .iter()
        .any(|w| w.contains("Pose estimation unavailable")));
}

// ============================================================================
// Failure and Retry
// ============================================================================

#[test]
fn test_missing_front_image_fails_without_retry() {
    // Scenario: the front view is a fatal precondition
    let mut store = MemoryImageStore::default();
    store.images.insert(ImageView::Portrait, portrait_fixture());

    let h = harness(store, Some(canonical_keypoints()));
    h.jobs.seed("cap-nofront");

    let job = h.orchestrator.process("cap-nofront").unwrap();
    assert_eq!(job.status, CaptureStatus::Failed);
    assert_eq!(job.attempts, 1, "fatal errors must not consume retries");
    assert!(job.error_message.as_ref().unwrap().contains("front"));
    assert!(h.metrics.document("cap-nofront").is_none());
}

#[test]
fn test_transient_failure_exhausts_retries() {
    let store = MemoryImageStore {
        images: HashMap::new(),
        fail_fetch: true,
    };

    let h = harness(store, Some(canonical_keypoints()));
    h.jobs.seed("cap-outage");

    let job = h.orchestrator.process("cap-outage").unwrap();
    assert_eq!(job.status, CaptureStatus::Failed);
    // Initial attempt plus max_retries
    assert_eq!(job.attempts, 4);
    assert!(job.error_message.as_ref().unwrap().contains("outage"));

    // The stored job reflects the final state
    assert_eq!(h.jobs.job("cap-outage").status, CaptureStatus::Failed);
}

#[test]
fn test_worker_pool_processes_queue() {
    let mut store = MemoryImageStore::default();
    store.images.insert(ImageView::Front, front_fixture());

    let jobs = Arc::new(MemoryJobStore::default());
    let metrics = Arc::new(MemoryMetricsSink::default());
    let orchestrator = Arc::new(Orchestrator::new(
        fast_config(),
        Arc::new(store),
        jobs.clone(),
        metrics.clone(),
        Arc::new(StubInferenceFactory {
            keypoints: Some(canonical_keypoints()),
        }),
    ));

    jobs.seed("cap-w1");
    jobs.seed("cap-w2");

    let pool = fitscan::WorkerPool::start(orchestrator, 2);
    pool.enqueue("cap-w1").unwrap();
    pool.enqueue("cap-w2").unwrap();
    pool.shutdown();

    assert_eq!(jobs.job("cap-w1").status, CaptureStatus::Done);
    assert_eq!(jobs.job("cap-w2").status, CaptureStatus::Done);
    assert!(metrics.document("cap-w1").is_some());
    assert!(metrics.document("cap-w2").is_some());
}

#[test]
fn test_unknown_capture_is_an_error() {
    let h = harness(MemoryImageStore::default(), None);
    let result = h.orchestrator.process("cap-ghost");
    assert!(matches!(
        result,
        Err(PipelineError::UnknownCapture { .. })
    ));
}
