//! Color calibration module
//!
//! This module normalizes lighting and camera color bias, either from
//! reference card patches or with a gray-world fallback, so that the
//! measurement and skin analysis stages see consistent colors.

pub mod color;

pub use color::{ColorCalibrator, ColorCorrection, CorrectionMethod};
