//! Color calibration from reference card patches
//!
//! Implements the corrective color transform for a capture:
//! - Card path: least-squares 3x3 matrix mapping detected patch colors to
//!   the known reference palette, applied to every pixel
//! - Fallback path: gray-world scaling when no card was detected
//!
//! Exactly one `ColorCorrection` is produced per capture and applied to
//! every image consumed by the measurement and skin analysis stages.

use opencv::{
    core::{self, Mat, CV_32F, CV_8U, DECOMP_SVD},
    prelude::*,
};
use serde::{Deserialize, Serialize};

use crate::config::ColorCalibrationConfig;
use crate::constants::reference_patches;
use crate::{PipelineError, Result};

/// How the corrective transform was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CorrectionMethod {
    /// Least-squares fit against reference card patches
    CardBased,
    /// Gray-world channel equalization
    GrayWorld,
    /// Identity (no correction applied)
    None,
}

impl std::fmt::Display for CorrectionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CorrectionMethod::CardBased => write!(f, "card-based"),
            CorrectionMethod::GrayWorld => write!(f, "gray-world"),
            CorrectionMethod::None => write!(f, "none"),
        }
    }
}

/// Corrective color transform for one capture
#[derive(Debug, Clone)]
pub struct ColorCorrection {
    /// 3x3 channel matrix in BGR pixel order; `None` for gray-world and
    /// identity corrections (gray-world gains depend on the target image)
    matrix: Option<Mat>,
    /// How the transform was obtained
    pub method: CorrectionMethod,
    /// Quality heuristic in [0, 1]
    pub quality: f32,
}

/// Color calibrator producing and applying corrective transforms
pub struct ColorCalibrator {
    config: ColorCalibrationConfig,
}

impl ColorCalibrator {
    /// Create a color calibrator with the given configuration
    pub fn new(config: ColorCalibrationConfig) -> Self {
        Self { config }
    }

    /// Number of patches expected from the rectified card
    pub fn patch_count(&self) -> usize {
        self.config.patch_count
    }

    /// Identity correction (no card, gray-world disabled)
    pub fn identity() -> ColorCorrection {
        ColorCorrection {
            matrix: None,
            method: CorrectionMethod::None,
            quality: 0.0,
        }
    }

    /// Gray-world fallback correction
    ///
    /// Channel gains are derived from each target image at application
    /// time, so the correction object itself carries no matrix.
    pub fn gray_world(&self) -> ColorCorrection {
        ColorCorrection {
            matrix: None,
            method: CorrectionMethod::GrayWorld,
            quality: self.config.gray_world_quality,
        }
    }

    /// Compute a card-based correction from detected patch colors
    ///
    /// Solves the least-squares system mapping detected patch colors onto
    /// the fixed reference palette. The solution is stored as a 3x3 channel
    /// matrix in BGR pixel order, ready for per-pixel application.
    ///
    /// # Arguments
    ///
    /// * `detected` - Average BGR color of each detected patch, left to right
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::ColorCorrection` when fewer than three
    /// patches are available or the system cannot be solved.
    pub fn from_patches(&self, detected: &[[f32; 3]]) -> Result<ColorCorrection> {
        let n = detected.len().min(reference_patches::COLORS.len());
        if n < 3 {
            return Err(PipelineError::ColorCorrection {
                reason: format!("need at least 3 patches, got {}", detected.len()),
            });
        }

        // Detected colors arrive in BGR; solve in RGB like the reference
        // palette is specified.
        let src_rows: Vec<[f32; 3]> = detected[..n]
            .iter()
            .map(|bgr| [bgr[2], bgr[1], bgr[0]])
            .collect();
        let tgt_rows: Vec<[f32; 3]> = reference_patches::COLORS[..n].to_vec();

        let src = Mat::from_slice_2d(&src_rows)
            .map_err(|e| PipelineError::opencv("patch matrix", e))?;
        let tgt = Mat::from_slice_2d(&tgt_rows)
            .map_err(|e| PipelineError::opencv("reference matrix", e))?;

        let mut solution = Mat::default();
        let solved = core::solve(&src, &tgt, &mut solution, DECOMP_SVD)
            .map_err(|e| PipelineError::opencv("solve", e))?;
        if !solved {
            return Err(PipelineError::ColorCorrection {
                reason: "least-squares system could not be solved".into(),
            });
        }

        // solution maps row-vectors (rgb * M); per-pixel application needs
        // column-vector form, re-ordered for BGR storage.
        let mut m_bgr = [[0.0f32; 3]; 3];
        for i in 0..3 {
            for j in 0..3 {
                let v = *solution
                    .at_2d::<f32>(2 - j as i32, 2 - i as i32)
                    .map_err(|e| PipelineError::opencv("solution access", e))?;
                m_bgr[i][j] = v;
            }
        }
        let matrix = Mat::from_slice_2d(&m_bgr)
            .map_err(|e| PipelineError::opencv("correction matrix", e))?;

        let quality = matrix_quality(&solution)?;
        log::info!(
            "Card-based color correction fit from {} patches, quality {:.2}",
            n,
            quality
        );

        Ok(ColorCorrection {
            matrix: Some(matrix),
            method: CorrectionMethod::CardBased,
            quality,
        })
    }

    /// Apply a correction to an image, clipping to the valid color range
    ///
    /// # Arguments
    ///
    /// * `correction` - The capture's corrective transform
    /// * `image` - BGR image to correct
    ///
    /// # Returns
    ///
    /// Corrected BGR image of the same size
    pub fn apply(&self, correction: &ColorCorrection, image: &Mat) -> Result<Mat> {
        let matrix = match correction.method {
            CorrectionMethod::None => {
                return image
                    .try_clone()
                    .map_err(|e| PipelineError::opencv("image clone", e));
            }
            CorrectionMethod::CardBased => correction
                .matrix
                .as_ref()
                .ok_or_else(|| PipelineError::ColorCorrection {
                    reason: "card-based correction has no matrix".into(),
                })?
                .clone(),
            CorrectionMethod::GrayWorld => gray_world_matrix(image)?,
        };

        let mut float_img = Mat::default();
        image
            .convert_to(&mut float_img, CV_32F, 1.0, 0.0)
            .map_err(|e| PipelineError::opencv("convert_to f32", e))?;

        let mut transformed = Mat::default();
        core::transform(&float_img, &mut transformed, &matrix)
            .map_err(|e| PipelineError::opencv("transform", e))?;

        // Conversion back to 8-bit saturates, clipping to [0, 255]
        let mut corrected = Mat::default();
        transformed
            .convert_to(&mut corrected, CV_8U, 1.0, 0.0)
            .map_err(|e| PipelineError::opencv("convert_to u8", e))?;

        Ok(corrected)
    }
}

/// Diagonal gray-world gain matrix for an image, in BGR order
///
/// Scales each channel so the channel means become equal to the global
/// mean. A channel mean near zero is left unscaled.
fn gray_world_matrix(image: &Mat) -> Result<Mat> {
    let means = core::mean(image, &core::no_array())
        .map_err(|e| PipelineError::opencv("channel means", e))?;

    let (avg_b, avg_g, avg_r) = (means[0], means[1], means[2]);
    let avg_gray = (avg_b + avg_g + avg_r) / 3.0;

    let gain = |m: f64| if m > f64::EPSILON { avg_gray / m } else { 1.0 };

    let rows = [
        [gain(avg_b) as f32, 0.0, 0.0],
        [0.0, gain(avg_g) as f32, 0.0],
        [0.0, 0.0, gain(avg_r) as f32],
    ];
    Mat::from_slice_2d(&rows).map_err(|e| PipelineError::opencv("gain matrix", e))
}

/// Quality heuristic from the conditioning of the fitted matrix
///
/// Inverse of the condition number (largest/smallest singular value),
/// normalized and clipped to [0, 1].
fn matrix_quality(matrix: &Mat) -> Result<f32> {
    let mut w = Mat::default();
    let mut u = Mat::default();
    let mut vt = Mat::default();
    core::sv_decomp(matrix, &mut w, &mut u, &mut vt, 0)
        .map_err(|e| PipelineError::opencv("sv_decomp", e))?;

    let mut s_max = f32::MIN;
    let mut s_min = f32::MAX;
    for i in 0..w.rows() {
        let v = *w
            .at_2d::<f32>(i, 0)
            .map_err(|e| PipelineError::opencv("singular value access", e))?;
        s_max = s_max.max(v);
        s_min = s_min.min(v);
    }

    if s_min <= f32::EPSILON {
        return Ok(0.0);
    }

    let condition = s_max / s_min;
    Ok((1.0 - condition / 100.0).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use opencv::core::{Scalar, Vec3b, CV_8UC3};

    fn calibrator() -> ColorCalibrator {
        ColorCalibrator::new(PipelineConfig::default().color_calibration)
    }

    #[test]
    fn test_method_tags_serialize() {
        assert_eq!(
            serde_json::to_string(&CorrectionMethod::CardBased).unwrap(),
            "\"card-based\""
        );
        assert_eq!(
            serde_json::to_string(&CorrectionMethod::GrayWorld).unwrap(),
            "\"gray-world\""
        );
        assert_eq!(serde_json::to_string(&CorrectionMethod::None).unwrap(), "\"none\"");
    }

    #[test]
    fn test_identity_correction_is_noop() {
        let image = Mat::new_rows_cols_with_default(
            4,
            4,
            CV_8UC3,
            Scalar::new(10.0, 200.0, 45.0, 0.0),
        )
        .unwrap();
        let corrected = calibrator().apply(&ColorCalibrator::identity(), &image).unwrap();
        let px: &Vec3b = corrected.at_2d(0, 0).unwrap();
        assert_eq!(px[0], 10);
        assert_eq!(px[1], 200);
        assert_eq!(px[2], 45);
    }

    #[test]
    fn test_gray_world_equalizes_channels() {
        // Strong blue cast; after correction channel means should converge
        let image = Mat::new_rows_cols_with_default(
            8,
            8,
            CV_8UC3,
            Scalar::new(200.0, 100.0, 100.0, 0.0),
        )
        .unwrap();

        let cal = calibrator();
        let corrected = cal.apply(&cal.gray_world(), &image).unwrap();
        let means = core::mean(&corrected, &core::no_array()).unwrap();

        assert!((means[0] - means[1]).abs() < 2.0);
        assert!((means[1] - means[2]).abs() < 2.0);
    }

    #[test]
    fn test_gray_world_zero_channel_guarded() {
        // Zero blue channel must not divide by zero; channel stays zero
        let image = Mat::new_rows_cols_with_default(
            8,
            8,
            CV_8UC3,
            Scalar::new(0.0, 120.0, 120.0, 0.0),
        )
        .unwrap();

        let cal = calibrator();
        let corrected = cal.apply(&cal.gray_world(), &image).unwrap();
        let px: &Vec3b = corrected.at_2d(0, 0).unwrap();
        assert_eq!(px[0], 0);
        assert!(px[1] > 0 && px[2] > 0);
    }

    #[test]
    fn test_card_based_identity_fit() {
        // Detected patches equal to the reference palette (converted to
        // BGR) must fit an identity transform with high quality.
        let detected: Vec<[f32; 3]> = reference_patches::COLORS
            .iter()
            .map(|rgb| [rgb[2], rgb[1], rgb[0]])
            .collect();

        let cal = calibrator();
        let correction = cal.from_patches(&detected).unwrap();
        assert_eq!(correction.method, CorrectionMethod::CardBased);
        assert!(correction.quality > 0.9, "quality {}", correction.quality);

        let image = Mat::new_rows_cols_with_default(
            4,
            4,
            CV_8UC3,
            Scalar::new(130.0, 150.0, 194.0, 0.0),
        )
        .unwrap();
        let corrected = cal.apply(&correction, &image).unwrap();
        let px: &Vec3b = corrected.at_2d(0, 0).unwrap();
        assert!((px[0] as i32 - 130).abs() <= 1);
        assert!((px[1] as i32 - 150).abs() <= 1);
        assert!((px[2] as i32 - 194).abs() <= 1);
    }

    #[test]
    fn test_card_based_corrects_channel_gain() {
        // Detected patches with the red channel dimmed by 20%; the fitted
        // transform must restore reference colors.
        let detected: Vec<[f32; 3]> = reference_patches::COLORS
            .iter()
            .map(|rgb| [rgb[2], rgb[1], rgb[0] * 0.8])
            .collect();

        let cal = calibrator();
        let correction = cal.from_patches(&detected).unwrap();

        // A pixel matching the dimmed light-skin patch should map back to
        // its reference value.
        let image = Mat::new_rows_cols_with_default(
            2,
            2,
            CV_8UC3,
            Scalar::new(130.0, 150.0, 194.0 * 0.8, 0.0),
        )
        .unwrap();
        let corrected = cal.apply(&correction, &image).unwrap();
        let px: &Vec3b = corrected.at_2d(0, 0).unwrap();
        assert!((px[2] as f32 - 194.0).abs() < 2.0, "red {}", px[2]);
        assert!((px[1] as f32 - 150.0).abs() < 2.0);
        assert!((px[0] as f32 - 130.0).abs() < 2.0);
    }

    #[test]
    fn test_from_patches_requires_three() {
        let cal = calibrator();
        let result = cal.from_patches(&[[10.0, 20.0, 30.0]]);
        assert!(matches!(
            result,
            Err(PipelineError::ColorCorrection { .. })
        ));
    }
}
