//! Skin patch extraction from segmentation masks
//!
//! Patches are cut from fixed fractional regions of the segmented person
//! (face, neck, arm). These heuristic boxes stand in for landmark-driven
//! region extraction; the external contract does not change if they are
//! upgraded later.

use opencv::{
    core::{Mat, Rect},
    prelude::*,
};
use serde::{Deserialize, Serialize};

use crate::{PipelineError, Result};

/// Skin sampling region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Face,
    Neck,
    Arm,
}

impl Region {
    /// Fractional bounding box `(x1, y1, x2, y2)` in normalized coordinates
    fn bounds(self) -> (f64, f64, f64, f64) {
        match self {
            Region::Face => (0.3, 0.1, 0.7, 0.4),
            Region::Neck => (0.4, 0.4, 0.6, 0.5),
            Region::Arm => (0.1, 0.5, 0.3, 0.8),
        }
    }
}

/// One extracted skin patch: image crop plus its mask crop
#[derive(Debug, Clone)]
pub struct SkinPatch {
    pub region: Region,
    pub image: Mat,
    pub mask: Mat,
}

/// Extract skin patches from fixed fractional regions of a segmented person
///
/// # Arguments
///
/// * `image` - Color-calibrated BGR image
/// * `mask` - Binary person/skin segmentation mask, same resolution
/// * `regions` - Regions to sample
/// * `min_pixels` - Minimum mask pixels for a region to qualify
///
/// # Returns
///
/// Patches for every region with sufficient skin coverage; may be empty.
///
/// # Errors
///
/// Returns `PipelineError::InvalidParameter` when mask and image
/// dimensions disagree.
pub fn extract_skin_patches(
    image: &Mat,
    mask: &Mat,
    regions: &[Region],
    min_pixels: i32,
) -> Result<Vec<SkinPatch>> {
    let (h, w) = (image.rows(), image.cols());
    if mask.rows() != h || mask.cols() != w {
        return Err(PipelineError::InvalidParameter {
            parameter: "segmentation_mask".into(),
            value: format!(
                "{}x{} (image is {}x{})",
                mask.cols(),
                mask.rows(),
                w,
                h
            ),
        });
    }

    let mut patches = Vec::new();

    for region in regions {
        let (x1, y1, x2, y2) = region.bounds();
        let rect = Rect::new(
            (x1 * w as f64) as i32,
            (y1 * h as f64) as i32,
            ((x2 - x1) * w as f64) as i32,
            ((y2 - y1) * h as f64) as i32,
        );
        if rect.width <= 0 || rect.height <= 0 {
            continue;
        }

        let region_mask = Mat::roi(mask, rect)
            .map_err(|e| PipelineError::opencv("mask roi", e))?
            .try_clone()
            .map_err(|e| PipelineError::opencv("mask clone", e))?;
        let skin_pixels = opencv::core::count_non_zero(&region_mask)
            .map_err(|e| PipelineError::opencv("count_non_zero", e))?;

        if skin_pixels <= min_pixels {
            log::debug!(
                "Region {:?} skipped: {} skin pixels (minimum {})",
                region,
                skin_pixels,
                min_pixels
            );
            continue;
        }

        let region_img = Mat::roi(image, rect)
            .map_err(|e| PipelineError::opencv("image roi", e))?
            .try_clone()
            .map_err(|e| PipelineError::opencv("image clone", e))?;

        patches.push(SkinPatch {
            region: *region,
            image: region_img,
            mask: region_mask,
        });
    }

    Ok(patches)
}
