//! Image decoding for capture processing
//!
//! Captures arrive from object storage as encoded byte buffers (JPEG or
//! PNG). This module decodes them into OpenCV Mat in BGR format for
//! consistent downstream processing, and provides a bounded-resize helper
//! for inference inputs.

use opencv::{
    core::{Mat, Size},
    imgproc,
    prelude::*,
};

use crate::{PipelineError, Result};

/// Decode an encoded image buffer into an OpenCV Mat (BGR format)
///
/// # Arguments
///
/// * `bytes` - Encoded image bytes (JPEG, PNG, and other formats the
///   `image` crate understands)
///
/// # Returns
///
/// OpenCV Mat in BGR format (standard OpenCV color order)
///
/// # Errors
///
/// Returns `PipelineError::ImageDecode` if the buffer cannot be decoded.
pub fn decode_image(bytes: &[u8]) -> Result<Mat> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| PipelineError::decode("Failed to decode image buffer", e))?;

    let rgb_img = img.to_rgb8();
    let (width, height) = rgb_img.dimensions();

    rgb_to_bgr_mat(&rgb_img.into_raw(), width as i32, height as i32)
}

/// Resize an image so its longest side does not exceed `max_dimension`
///
/// Aspect ratio is preserved; images already within bounds are returned
/// unchanged (cloned).
pub fn resize_max_dimension(image: &Mat, max_dimension: i32) -> Result<Mat> {
    let (h, w) = (image.rows(), image.cols());

    if h.max(w) <= max_dimension {
        return image
            .try_clone()
            .map_err(|e| PipelineError::opencv("image clone", e));
    }

    let (new_w, new_h) = if h > w {
        ((w as f64 * max_dimension as f64 / h as f64) as i32, max_dimension)
    } else {
        (max_dimension, (h as f64 * max_dimension as f64 / w as f64) as i32)
    };

    let mut resized = Mat::default();
    imgproc::resize(
        image,
        &mut resized,
        Size::new(new_w, new_h),
        0.0,
        0.0,
        imgproc::INTER_AREA,
    )
    .map_err(|e| PipelineError::opencv("resize", e))?;

    Ok(resized)
}

/// Convert RGB byte buffer to OpenCV BGR Mat
fn rgb_to_bgr_mat(rgb_data: &[u8], width: i32, height: i32) -> Result<Mat> {
    use opencv::core::{Vec3b, CV_8UC3};

    let mut mat = Mat::zeros(height, width, CV_8UC3)
        .map_err(|e| PipelineError::opencv("Mat creation", e))?
        .to_mat()
        .map_err(|e| PipelineError::opencv("Mat conversion", e))?;

    for y in 0..height {
        for x in 0..width {
            let idx = ((y * width + x) * 3) as usize;
            let r = rgb_data[idx];
            let g = rgb_data[idx + 1];
            let b = rgb_data[idx + 2];

            let pixel = mat
                .at_2d_mut::<Vec3b>(y, x)
                .map_err(|e| PipelineError::opencv("pixel access", e))?;
            pixel[0] = b;
            pixel[1] = g;
            pixel[2] = r;
        }
    }

    Ok(mat)
}
