//! # fitscan
//!
//! A Rust crate for deriving calibrated body measurements and a
//! skin-tone/color-season profile from capture photographs.
//!
//! This library provides the capture processing pipeline:
//! - Detecting and rectifying a physical reference card for scale
//! - Computing a corrective color transform (card patches or gray-world)
//! - Converting externally-produced pose keypoints into physical
//!   measurements with approximate circumferences
//! - Analyzing skin tone: Lab, ITA, Monk bucket, undertone, color season
//! - Orchestrating one capture through all stages with retry and
//!   failure handling
//!
//! HTTP routing, persistence, object storage, and the pose/segmentation
//! inference itself are external collaborators, modeled as traits in
//! [`pipeline::collaborators`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use fitscan::{Orchestrator, PipelineConfig};
//! # use fitscan::pipeline::{ImageStore, JobStore, MetricsSink, InferenceFactory};
//! # fn collaborators() -> (Arc<dyn ImageStore>, Arc<dyn JobStore>, Arc<dyn MetricsSink>, Arc<dyn InferenceFactory>) { unimplemented!() }
//!
//! let (images, jobs, metrics, inference) = collaborators();
//! let orchestrator = Orchestrator::new(
//!     PipelineConfig::default(),
//!     images,
//!     jobs,
//!     metrics,
//!     inference,
//! );
//! let job = orchestrator.process("capture-123")?;
//! println!("capture finished with status {}", job.status);
//! # Ok::<(), fitscan::PipelineError>(())
//! ```

pub mod calibration;
pub mod color;
pub mod config;
pub mod constants;
pub mod detection;
pub mod error;
pub mod image_loader;
pub mod measure;
pub mod pipeline;
pub mod skin;
pub mod worker;

pub use calibration::{ColorCalibrator, ColorCorrection, CorrectionMethod};
pub use config::PipelineConfig;
pub use detection::{CardDetection, CardDetector};
pub use error::{PipelineError, Result};
pub use measure::{KeypointSet, Measurement, MeasurementExtractor, MeasurementSet};
pub use pipeline::{CaptureDocument, CaptureJob, CaptureStatus, Orchestrator};
pub use skin::{SkinAnalyzer, SkinProfile};
pub use worker::WorkerPool;
