//! Per-capture pipeline orchestration
//!
//! Drives one capture through the full stage sequence, strictly in order:
//! image load, card detection, color calibration, pose inference,
//! measurement extraction, segmentation, skin analysis, circumference
//! refinement, confidence aggregation, persistence. Soft failures (missing
//! card, unavailable inference) degrade the result with warnings; a missing
//! front image is fatal and never retried; everything else is retried as a
//! whole pipeline up to a fixed bound with fixed backoff.

use std::sync::Arc;
use std::time::Duration;

use opencv::core::Mat;
use opencv::prelude::*;

use crate::calibration::{ColorCalibrator, ColorCorrection, CorrectionMethod};
use crate::config::PipelineConfig;
use crate::detection::{CardDetection, CardDetector};
use crate::image_loader::{decode_image, resize_max_dimension};
use crate::measure::{
    CircumferenceEstimator, EllipticalEstimator, MeasurementExtractor, MeasurementSet,
};
use crate::pipeline::collaborators::{
    ImageStore, ImageView, InferenceFactory, JobStore, MetricsSink,
};
use crate::pipeline::job::CaptureJob;
use crate::pipeline::result::{
    CaptureDocument, MeasurementSnapshots, QualityReport, ShapeClassification,
};
use crate::skin::{extract_skin_patches, Region, SkinAnalyzer, SkinProfile};
use crate::{PipelineError, Result};

/// Skin sampling regions used by the pipeline
const SKIN_REGIONS: [Region; 2] = [Region::Face, Region::Neck];

/// Longest side of images handed to the inference services
const INFERENCE_MAX_DIMENSION: i32 = 512;

/// Weight of pose confidence in the overall capture confidence
const POSE_CONFIDENCE_WEIGHT: f32 = 0.8;

/// Minimum correction quality considered acceptable lighting
const LIGHTING_QUALITY_FLOOR: f32 = 0.2;

/// Orchestrates the capture processing pipeline
pub struct Orchestrator {
    config: PipelineConfig,
    images: Arc<dyn ImageStore>,
    jobs: Arc<dyn JobStore>,
    metrics: Arc<dyn MetricsSink>,
    inference: Arc<dyn InferenceFactory>,
    circumference: Box<dyn CircumferenceEstimator>,
}

impl Orchestrator {
    /// Create an orchestrator with the default circumference strategy
    pub fn new(
        config: PipelineConfig,
        images: Arc<dyn ImageStore>,
        jobs: Arc<dyn JobStore>,
        metrics: Arc<dyn MetricsSink>,
        inference: Arc<dyn InferenceFactory>,
    ) -> Self {
        let circumference =
            Box::new(EllipticalEstimator::new(config.measurement.depth_width_ratio));
        Self {
            config,
            images,
            jobs,
            metrics,
            inference,
            circumference,
        }
    }

    /// Replace the circumference strategy (e.g. with a trained regressor)
    pub fn with_circumference_estimator(
        mut self,
        estimator: Box<dyn CircumferenceEstimator>,
    ) -> Self {
        self.circumference = estimator;
        self
    }

    /// Process one capture to completion
    ///
    /// Idempotent given the same stored artifacts. On success the job
    /// transitions to `done` and the result document is persisted; on
    /// failure the job transitions to `failed` with a human-readable
    /// error message. Transient errors re-run the entire pipeline up to
    /// the configured retry bound with fixed backoff; fatal errors abort
    /// immediately without consuming the retry budget.
    ///
    /// # Returns
    ///
    /// The job's final state.
    pub fn process(&self, capture_id: &str) -> Result<CaptureJob> {
        let mut job = self
            .jobs
            .load(capture_id)?
            .ok_or_else(|| PipelineError::UnknownCapture {
                capture_id: capture_id.to_string(),
            })?;

        log::info!("Starting processing for capture {capture_id}");
        job.start_processing();
        self.jobs.save(&job)?;

        let max_attempts = self.config.retry.max_retries + 1;
        loop {
            job.attempts += 1;

            let outcome = self.run_pipeline(capture_id).and_then(|document| {
                self.metrics
                    .persist(capture_id, &document)
                    .map_err(|e| PipelineError::Persistence {
                        message: e.to_string(),
                    })
            });

            match outcome {
                Ok(()) => {
                    job.complete();
                    self.jobs.save(&job)?;
                    log::info!("Capture {capture_id} processed successfully");
                    return Ok(job);
                }
                Err(e) if e.is_fatal() => {
                    log::error!("Capture {capture_id} failed fatally: {e}");
                    job.fail(e.to_string());
                    self.jobs.save(&job)?;
                    return Ok(job);
                }
                Err(e) if job.attempts >= max_attempts => {
                    log::error!(
                        "Capture {capture_id} failed after {} attempts: {e}",
                        job.attempts
                    );
                    job.fail(e.to_string());
                    self.jobs.save(&job)?;
                    return Ok(job);
                }
                Err(e) => {
                    log::warn!(
                        "Capture {capture_id} attempt {} failed, retrying: {e}",
                        job.attempts
                    );
                    self.jobs.save(&job)?;
                    std::thread::sleep(Duration::from_secs(self.config.retry.backoff_secs));
                }
            }
        }
    }

    /// Run all pipeline stages for one attempt
    fn run_pipeline(&self, capture_id: &str) -> Result<CaptureDocument> {
        let mut warnings: Vec<String> = Vec::new();

        // Stage 1: image load; the front view is a hard precondition
        let front = self
            .fetch_image(capture_id, ImageView::Front)?
            .ok_or_else(|| PipelineError::MissingImage {
                view: ImageView::Front.to_string(),
            })?;
        let reference = self.fetch_image(capture_id, ImageView::Reference)?;
        let portrait = self.fetch_image(capture_id, ImageView::Portrait)?;

        // Stage 2: card detection
        log::info!("[{capture_id}] Stage 2: card detection");
        let detector = CardDetector::new(self.config.card_detection.clone());
        let card_detection = match &reference {
            Some(reference) => detector.detect(reference)?,
            None => None,
        };

        let scale = match &card_detection {
            Some(detection) => detection.scale,
            None => {
                if reference.is_some() {
                    warnings
                        .push("Reference card not detected; using default scale".to_string());
                } else {
                    warnings
                        .push("No reference image supplied; using default scale".to_string());
                }
                self.config.measurement.default_scale
            }
        };

        // Stage 3: color calibration, applied to every downstream image
        log::info!("[{capture_id}] Stage 3: color calibration");
        let calibrator = ColorCalibrator::new(self.config.color_calibration.clone());
        let correction =
            self.build_correction(&calibrator, &detector, &card_detection, &mut warnings);
        let front = calibrator.apply(&correction, &front)?;
        let portrait = match portrait {
            Some(p) => Some(calibrator.apply(&correction, &p)?),
            None => None,
        };

        // Stage 4: pose inference; keypoints are normalized, so the
        // measurement stage can keep using the full-resolution dimensions
        log::info!("[{capture_id}] Stage 4: pose inference");
        let pose_input = resize_max_dimension(&front, INFERENCE_MAX_DIMENSION)?;
        let (keypoints, pose_version) = match self.inference.pose_model() {
            Ok(model) => {
                let version = model.version();
                match model.keypoints(&pose_input) {
                    Ok(Some(kps)) => (Some(kps), version),
                    Ok(None) => {
                        warnings.push("No pose detected in front image".to_string());
                        (None, version)
                    }
                    Err(e) => {
                        log::warn!("Pose inference failed: {e}");
                        warnings.push("Pose estimation unavailable".to_string());
                        (None, version)
                    }
                }
            }
            Err(e) => {
                log::warn!("Pose model unavailable: {e}");
                warnings.push("Pose estimation unavailable".to_string());
                (None, "unavailable".to_string())
            }
        };

        // Stage 5: measurement extraction
        log::info!("[{capture_id}] Stage 5: measurement extraction");
        let (mut measurements, pose_confidence) = match &keypoints {
            Some(kps) => {
                let extractor =
                    MeasurementExtractor::new(self.config.measurement.clone(), scale)?;
                let m = extractor.extract(kps, front.cols() as u32, front.rows() as u32);
                let confidence = extractor.confidence(kps);
                (m, confidence)
            }
            None => {
                warnings.push("Measurements skipped: no keypoints".to_string());
                (MeasurementSet::new(), 0.0)
            }
        };

        // Stages 6-7: segmentation and skin analysis
        log::info!("[{capture_id}] Stages 6-7: skin analysis");
        let (skin, segmentation_version) = self.analyze_skin(
            portrait.as_ref(),
            correction.method == CorrectionMethod::CardBased,
            &mut warnings,
        );

        // Stage 8: circumference refinement
        log::info!("[{capture_id}] Stage 8: circumference refinement");
        let circumferences = self.circumference.circumferences(&measurements);
        measurements.extend(circumferences);

        // Stage 9: confidence aggregation
        let overall_confidence = pose_confidence * POSE_CONFIDENCE_WEIGHT;
        let quality = QualityReport {
            lighting_ok: correction.quality >= LIGHTING_QUALITY_FLOOR,
            card_detected: card_detection.is_some(),
            overall_confidence,
            warnings,
        };

        // Stage 10: result assembly (persistence happens in `process`)
        let model_versions = std::collections::BTreeMap::from([
            ("pose".to_string(), pose_version),
            ("segmentation".to_string(), segmentation_version),
            ("regressor".to_string(), self.circumference.version()),
        ]);

        Ok(CaptureDocument {
            measurements: MeasurementSnapshots::new(measurements),
            skin,
            shape: ShapeClassification::unknown(),
            quality,
            model_versions,
        })
    }

    /// Fetch and decode one view, `None` when not uploaded
    fn fetch_image(&self, capture_id: &str, view: ImageView) -> Result<Option<Mat>> {
        match self.images.fetch(capture_id, view)? {
            Some(bytes) => Ok(Some(decode_image(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Build the capture's color correction, falling back to gray-world
    fn build_correction(
        &self,
        calibrator: &ColorCalibrator,
        detector: &CardDetector,
        card_detection: &Option<CardDetection>,
        warnings: &mut Vec<String>,
    ) -> ColorCorrection {
        let detection = match card_detection {
            Some(detection) => detection,
            None => return calibrator.gray_world(),
        };

        let correction = detector
            .extract_color_patches(&detection.rectified, calibrator.patch_count())
            .and_then(|patches| calibrator.from_patches(&patches));

        match correction {
            Ok(correction) => correction,
            Err(e) => {
                log::warn!("Card color calibration failed: {e}");
                warnings.push(
                    "Card color calibration failed; falling back to gray-world".to_string(),
                );
                calibrator.gray_world()
            }
        }
    }

    /// Run segmentation and skin analysis; every failure here is soft
    fn analyze_skin(
        &self,
        portrait: Option<&Mat>,
        card_calibrated: bool,
        warnings: &mut Vec<String>,
    ) -> (Option<SkinProfile>, String) {
        let portrait = match portrait {
            Some(portrait) => portrait,
            None => {
                warnings.push("No portrait image; skin analysis skipped".to_string());
                return (None, "unavailable".to_string());
            }
        };

        // Mask and patches must share one resolution
        let portrait = match resize_max_dimension(portrait, INFERENCE_MAX_DIMENSION) {
            Ok(portrait) => portrait,
            Err(e) => {
                log::warn!("Portrait resize failed: {e}");
                warnings.push("Portrait unusable; skin analysis skipped".to_string());
                return (None, "unavailable".to_string());
            }
        };

        let model = match self.inference.segmentation_model() {
            Ok(model) => model,
            Err(e) => {
                log::warn!("Segmentation model unavailable: {e}");
                warnings.push("Segmentation unavailable; skin analysis skipped".to_string());
                return (None, "unavailable".to_string());
            }
        };
        let version = model.version();

        let mask = match model.person_mask(&portrait) {
            Ok(Some(mask)) => mask,
            Ok(None) => {
                warnings.push("No person found in portrait image".to_string());
                return (None, version);
            }
            Err(e) => {
                log::warn!("Segmentation failed: {e}");
                warnings.push("Segmentation unavailable; skin analysis skipped".to_string());
                return (None, version);
            }
        };

        let analyzed = extract_skin_patches(
            &portrait,
            &mask,
            &SKIN_REGIONS,
            self.config.skin_analysis.min_region_pixels,
        )
        .and_then(|patches| {
            SkinAnalyzer::new(self.config.skin_analysis.clone())
                .analyze(&patches, card_calibrated)
        });

        match analyzed {
            Ok(Some(profile)) => (Some(profile), version),
            Ok(None) => {
                warnings.push("No usable skin patches found".to_string());
                (None, version)
            }
            Err(e) => {
                log::warn!("Skin analysis failed: {e}");
                warnings.push("Skin analysis failed".to_string());
                (None, version)
            }
        }
    }
}
