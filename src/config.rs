//! Configuration structures for the capture processing pipeline.
//!
//! This module defines all tunable parameters for capture processing,
//! organized into logical groups for card detection, color calibration,
//! measurement extraction, skin analysis, and retry behavior.
//!
//! # Configuration Loading
//!
//! Configuration can be loaded from JSON files or constructed programmatically:
//!
//! ```no_run
//! use fitscan::PipelineConfig;
//! use std::path::Path;
//!
//! // Load from file
//! let config = PipelineConfig::from_json_file(Path::new("config.json"))?;
//!
//! // Or use defaults
//! let config = PipelineConfig::default();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use serde::{Deserialize, Serialize};

use crate::constants::{card, measurement};

/// Complete pipeline configuration for capture processing.
///
/// Contains all parameters needed to process a capture from raw images
/// to a persisted result document. Can be serialized to/from JSON for
/// reproducible runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Reference card detection configuration
    pub card_detection: CardDetectionConfig,

    /// Color calibration configuration
    pub color_calibration: ColorCalibrationConfig,

    /// Measurement extraction configuration
    pub measurement: MeasurementConfig,

    /// Skin analysis configuration
    pub skin_analysis: SkinAnalysisConfig,

    /// Retry behavior for failed captures
    pub retry: RetryConfig,
}

/// Reference card detection parameters.
///
/// Controls the edge detection and contour analysis used to locate the
/// reference card, and the geometry of the physical card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardDetectionConfig {
    /// Physical card width in cm
    pub card_width_cm: f64,

    /// Physical card height in cm
    pub card_height_cm: f64,

    /// Minimum card area as fraction of image (0.0-1.0)
    pub min_area_ratio: f64,

    /// Maximum card area as fraction of image (0.0-1.0)
    pub max_area_ratio: f64,

    /// Polygon approximation epsilon as fraction of perimeter
    pub poly_approx_epsilon: f64,

    /// Canny edge detection low threshold
    pub canny_low_threshold: f64,

    /// Canny edge detection high threshold
    pub canny_high_threshold: f64,

    /// Gaussian blur kernel size (must be odd)
    pub gaussian_blur_kernel_size: i32,

    /// RANSAC reprojection threshold for homography fitting, in pixels
    pub ransac_reproj_threshold: f64,
}

/// Color calibration parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorCalibrationConfig {
    /// Number of color patches extracted from the rectified card
    pub patch_count: usize,

    /// Quality assigned to the gray-world fallback correction
    pub gray_world_quality: f32,
}

/// Measurement extraction parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementConfig {
    /// Scale applied when no reference card was detected (pixels per cm)
    pub default_scale: f64,

    /// Nose-to-crown correction factor for the height measurement
    pub head_offset_factor: f64,

    /// Chest width as a fraction of shoulder width
    pub chest_shoulder_ratio: f64,

    /// Waist width as a fraction of hip width
    pub waist_hip_ratio: f64,

    /// Assumed depth/width ratio for circumference estimation
    pub depth_width_ratio: f64,
}

/// Skin analysis parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkinAnalysisConfig {
    /// Minimum mask pixels for a region to qualify as a skin patch
    pub min_region_pixels: i32,

    /// Divisor normalizing channel stddev into a uniformity score
    pub uniformity_stddev_divisor: f32,

    /// Confidence bonus applied when the input was card-calibrated
    pub calibration_bonus: f32,
}

/// Retry behavior for failed captures.
///
/// A capture that fails with a transient error is re-run from the start,
/// up to `max_retries` additional attempts with a fixed delay between
/// attempts. Fatal errors never consume this budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retries after the initial attempt
    pub max_retries: u32,

    /// Fixed delay between attempts, in seconds
    pub backoff_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            card_detection: CardDetectionConfig {
                card_width_cm: card::WIDTH_CM,
                card_height_cm: card::HEIGHT_CM,
                min_area_ratio: 0.01,
                max_area_ratio: 0.50,
                poly_approx_epsilon: 0.02,
                canny_low_threshold: 50.0,
                canny_high_threshold: 150.0,
                gaussian_blur_kernel_size: 5,
                ransac_reproj_threshold: 5.0,
            },
            color_calibration: ColorCalibrationConfig {
                patch_count: crate::constants::reference_patches::PATCH_COUNT,
                gray_world_quality: 0.5,
            },
            measurement: MeasurementConfig {
                default_scale: card::DEFAULT_SCALE,
                head_offset_factor: measurement::HEAD_OFFSET_FACTOR,
                chest_shoulder_ratio: measurement::CHEST_SHOULDER_RATIO,
                waist_hip_ratio: measurement::WAIST_HIP_RATIO,
                depth_width_ratio: measurement::DEPTH_WIDTH_RATIO,
            },
            skin_analysis: SkinAnalysisConfig {
                min_region_pixels: crate::constants::skin::MIN_REGION_PIXELS,
                uniformity_stddev_divisor: crate::constants::skin::UNIFORMITY_STDDEV_DIVISOR,
                calibration_bonus: crate::constants::skin::CALIBRATION_BONUS,
            },
            retry: RetryConfig {
                max_retries: 3,
                backoff_secs: 60,
            },
        }
    }
}

impl PipelineConfig {
    /// Load configuration from JSON file
    pub fn from_json_file(path: &std::path::Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to JSON file
    pub fn to_json_file(&self, path: &std::path::Path) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
