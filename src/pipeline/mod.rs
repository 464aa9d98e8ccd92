//! Capture processing pipeline
//!
//! This module drives one capture through the full processing sequence:
//! card detection, color calibration, pose-based measurement extraction,
//! skin analysis, circumference refinement, confidence aggregation, and
//! persistence, with retry and failure handling.

pub mod collaborators;
pub mod job;
pub mod orchestrator;
pub mod result;

pub use collaborators::{
    ImageStore, ImageView, InferenceFactory, JobStore, MetricsSink, PoseModel,
    SegmentationModel,
};
pub use job::{CaptureJob, CaptureStatus};
pub use orchestrator::Orchestrator;
pub use result::{CaptureDocument, MeasurementSnapshots, QualityReport, ShapeClassification};
