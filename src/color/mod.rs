//! Color space conversion and statistics module
//!
//! This module handles color space conversions between device RGB and
//! perceptual Lab, and masked color statistics over image regions.

pub mod conversion;

pub use conversion::ColorConverter;
