//! Color space conversion utilities
//!
//! Provides conversions between color spaces and masked color statistics:
//! - BGR/RGB to Lab
//! - Lab to sRGB with gamut clamping
//! - Hex color representation
//! - Masked mean and standard deviation over image regions

use opencv::{core::Mat, prelude::*};
use palette::{FromColor, IntoColor, Lab, Srgb};

use crate::{PipelineError, Result};

/// Color converter between device RGB and perceptual Lab
pub struct ColorConverter;

impl Default for ColorConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl ColorConverter {
    /// Create a new color converter (D65 illuminant throughout)
    pub fn new() -> Self {
        Self
    }

    /// Convert RGB (0-255) to Lab color space
    ///
    /// # Arguments
    ///
    /// * `r`, `g`, `b` - RGB values in range [0, 255]
    ///
    /// # Returns
    ///
    /// Lab color in D65 illuminant (`L` in [0, 100], `a`/`b` in [-128, 127])
    pub fn rgb_to_lab(&self, r: f32, g: f32, b: f32) -> Lab {
        let srgb = Srgb::new(r / 255.0, g / 255.0, b / 255.0);
        Lab::from_color(srgb)
    }

    /// Convert Lab to sRGB with gamut clamping
    pub fn lab_to_srgb(&self, lab: Lab) -> Srgb {
        let srgb: Srgb = lab.into_color();
        Srgb::new(
            srgb.red.clamp(0.0, 1.0),
            srgb.green.clamp(0.0, 1.0),
            srgb.blue.clamp(0.0, 1.0),
        )
    }

    /// Convert sRGB to hexadecimal color string
    pub fn srgb_to_hex(&self, srgb: Srgb) -> String {
        let r = (srgb.red * 255.0).round() as u8;
        let g = (srgb.green * 255.0).round() as u8;
        let b = (srgb.blue * 255.0).round() as u8;
        format!("#{:02X}{:02X}{:02X}", r, g, b)
    }

    /// Convert Lab to a display hex string, clamped to the sRGB gamut
    pub fn lab_to_hex(&self, lab: Lab) -> String {
        self.srgb_to_hex(self.lab_to_srgb(lab))
    }
}

/// Compute per-channel mean and standard deviation over mask pixels
///
/// # Arguments
///
/// * `image` - BGR image (CV_8UC3)
/// * `mask` - Optional binary mask; `None` includes every pixel
///
/// # Returns
///
/// `(mean, stddev)` in BGR order, or `None` when no pixel is selected
pub fn masked_mean_std_bgr(
    image: &Mat,
    mask: Option<&Mat>,
) -> Result<Option<([f32; 3], [f32; 3])>> {
    let mut sum = [0.0f64; 3];
    let mut sum_sq = [0.0f64; 3];
    let mut count = 0u64;

    for row in 0..image.rows() {
        for col in 0..image.cols() {
            if let Some(mask) = mask {
                let mask_val = *mask
                    .at_2d::<u8>(row, col)
                    .map_err(|e| PipelineError::opencv("mask access", e))?;
                if mask_val == 0 {
                    continue;
                }
            }

            let pixel = image
                .at_2d::<opencv::core::Vec3b>(row, col)
                .map_err(|e| PipelineError::opencv("pixel access", e))?;
            for c in 0..3 {
                let v = pixel[c] as f64;
                sum[c] += v;
                sum_sq[c] += v * v;
            }
            count += 1;
        }
    }

    if count == 0 {
        return Ok(None);
    }

    let mut mean = [0.0f32; 3];
    let mut std = [0.0f32; 3];
    for c in 0..3 {
        let m = sum[c] / count as f64;
        mean[c] = m as f32;
        std[c] = (sum_sq[c] / count as f64 - m * m).max(0.0).sqrt() as f32;
    }

    Ok(Some((mean, std)))
}
