//! Reference card detection and perspective rectification
//!
//! Implements card detection that:
//! - Locates the rectangular calibration card via edge/contour analysis
//! - Scores quadrilateral candidates by area and aspect ratio match
//! - Computes a robust homography and a pixels-per-cm scale factor
//! - Rewarps the card region into a canonical fronto-parallel rectangle

use opencv::{
    calib3d,
    core::{Mat, Point, Point2f, Rect, Scalar, Size, Vector, BORDER_CONSTANT},
    imgproc::{
        approx_poly_dp, arc_length, bounding_rect, canny, contour_area, cvt_color,
        find_contours, gaussian_blur, warp_perspective, CHAIN_APPROX_SIMPLE, COLOR_BGR2GRAY,
        RETR_EXTERNAL,
    },
    prelude::*,
};

use crate::config::CardDetectionConfig;
use crate::{PipelineError, Result};

// Type aliases for OpenCV vector types
type VectorOfPoint = Vector<Point>;
type VectorOfPoint2f = Vector<Point2f>;

/// Card detection result with rectification data
#[derive(Debug, Clone)]
pub struct CardDetection {
    /// Card corners in original image coordinates, ordered TL, TR, BR, BL
    pub corners: [Point2f; 4],
    /// 3x3 homography mapping the detected corners to the canonical rectangle
    pub homography: Mat,
    /// Scale factor in pixels per cm (always > 0)
    pub scale: f64,
    /// Card region rewarped into the canonical rectangle
    pub rectified: Mat,
    /// Confidence from aspect ratio match to the physical card (0.0-1.0)
    pub confidence: f32,
}

/// Reference card detector
pub struct CardDetector {
    config: CardDetectionConfig,
}

impl CardDetector {
    /// Create a card detector with the given configuration
    pub fn new(config: CardDetectionConfig) -> Self {
        Self { config }
    }

    /// Expected aspect ratio of the physical card (width / height)
    fn expected_aspect(&self) -> f64 {
        self.config.card_width_cm / self.config.card_height_cm
    }

    /// Detect the reference card in an image
    ///
    /// # Arguments
    ///
    /// * `image` - Input BGR image
    ///
    /// # Returns
    ///
    /// `Some(CardDetection)` when a plausible card was found, `None` when
    /// no candidate region exists. A missing card is not an error; the
    /// caller falls back to gray-world correction and a default scale.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError` only for OpenCV failures, never for an
    /// absent card.
    pub fn detect(&self, image: &Mat) -> Result<Option<CardDetection>> {
        let edges = self.preprocess(image)?;

        let mut contours = Vector::<VectorOfPoint>::new();
        find_contours(
            &edges,
            &mut contours,
            RETR_EXTERNAL,
            CHAIN_APPROX_SIMPLE,
            Point::new(0, 0),
        )
        .map_err(|e| PipelineError::opencv("find_contours", e))?;

        let corners = match self.find_card_corners(&contours, image)? {
            Some(corners) => corners,
            None => {
                log::warn!("No reference card detected");
                return Ok(None);
            }
        };

        let ordered = order_corners(&corners);
        let (homography, scale, dst_size) = self.compute_transform(&ordered)?;

        let mut rectified = Mat::default();
        warp_perspective(
            image,
            &mut rectified,
            &homography,
            dst_size,
            opencv::imgproc::INTER_LINEAR,
            BORDER_CONSTANT,
            Scalar::default(),
        )
        .map_err(|e| PipelineError::opencv("warp_perspective", e))?;

        let detected_aspect = aspect_ratio(&ordered);
        let expected = self.expected_aspect();
        let aspect_diff = (detected_aspect - expected).abs() / expected;
        let confidence = (1.0 - aspect_diff).max(0.0) as f32;

        log::info!(
            "Card detected with confidence {:.2}, scale {:.2} px/cm",
            confidence,
            scale
        );

        Ok(Some(CardDetection {
            corners: ordered,
            homography,
            scale,
            rectified,
            confidence,
        }))
    }

    /// Extract color calibration patches from the rectified card image
    ///
    /// Patches are assumed to be arranged horizontally; each patch is
    /// sampled from its inner half in both axes to avoid bleed between
    /// neighbors.
    ///
    /// # Arguments
    ///
    /// * `rectified` - Perspective-corrected card image
    /// * `n_patches` - Number of color patches to extract
    ///
    /// # Returns
    ///
    /// Average BGR color of each patch, left to right
    pub fn extract_color_patches(
        &self,
        rectified: &Mat,
        n_patches: usize,
    ) -> Result<Vec<[f32; 3]>> {
        let (h, w) = (rectified.rows(), rectified.cols());
        let patch_width = w / n_patches as i32;
        if patch_width < 4 || h < 4 {
            return Err(PipelineError::Processing(
                "Rectified card too small for patch extraction".into(),
            ));
        }

        let mut patches = Vec::with_capacity(n_patches);
        for i in 0..n_patches as i32 {
            let x_start = i * patch_width + patch_width / 4;
            let x_end = (i + 1) * patch_width - patch_width / 4;
            let y_start = h / 4;
            let y_end = 3 * h / 4;

            let roi = Rect::new(x_start, y_start, x_end - x_start, y_end - y_start);
            let patch = Mat::roi(rectified, roi)
                .map_err(|e| PipelineError::opencv("patch roi", e))?
                .try_clone()
                .map_err(|e| PipelineError::opencv("patch clone", e))?;
            let mean = opencv::core::mean(&patch, &opencv::core::no_array())
                .map_err(|e| PipelineError::opencv("patch mean", e))?;

            patches.push([mean[0] as f32, mean[1] as f32, mean[2] as f32]);
        }

        Ok(patches)
    }

    /// Preprocess: grayscale, blur, edge detection
    fn preprocess(&self, image: &Mat) -> Result<Mat> {
        let mut gray = Mat::default();
        cvt_color(
            image,
            &mut gray,
            COLOR_BGR2GRAY,
            0,
        )
        .map_err(|e| PipelineError::opencv("grayscale conversion", e))?;

        let k = self.config.gaussian_blur_kernel_size;
        let mut blurred = Mat::default();
        gaussian_blur(
            &gray,
            &mut blurred,
            Size::new(k, k),
            0.0,
            0.0,
            BORDER_CONSTANT,
        )
        .map_err(|e| PipelineError::opencv("gaussian_blur", e))?;

        let mut edges = Mat::default();
        canny(
            &blurred,
            &mut edges,
            self.config.canny_low_threshold,
            self.config.canny_high_threshold,
            3,
            false,
        )
        .map_err(|e| PipelineError::opencv("canny", e))?;

        Ok(edges)
    }

    /// Find the card corner candidates among the extracted contours
    ///
    /// Quadrilaterals are scored by `area / (1 + 10 * |aspect - expected|)`
    /// and the best one wins (ties broken by first-found). When no contour
    /// approximates to a quadrilateral, the bounding box of the largest
    /// in-range contour serves as a 4-point fallback.
    fn find_card_corners(
        &self,
        contours: &Vector<VectorOfPoint>,
        image: &Mat,
    ) -> Result<Option<[Point2f; 4]>> {
        let image_area = (image.rows() * image.cols()) as f64;
        let min_area = image_area * self.config.min_area_ratio;
        let max_area = image_area * self.config.max_area_ratio;
        let expected = self.expected_aspect();

        let mut best_quad: Option<[Point2f; 4]> = None;
        let mut best_score = 0.0;
        let mut fallback: Option<VectorOfPoint> = None;
        let mut fallback_area = 0.0;

        for contour in contours.iter() {
            let area = contour_area(&contour, false)
                .map_err(|e| PipelineError::opencv("contour_area", e))?;

            if area < min_area || area > max_area {
                continue;
            }

            if area > fallback_area {
                fallback_area = area;
                fallback = Some(contour.clone());
            }

            let peri = arc_length(&contour, true)
                .map_err(|e| PipelineError::opencv("arc_length", e))?;
            let mut approx = VectorOfPoint::new();
            approx_poly_dp(&contour, &mut approx, self.config.poly_approx_epsilon * peri, true)
                .map_err(|e| PipelineError::opencv("approx_poly_dp", e))?;

            if approx.len() == 4 {
                let corners = [
                    point_to_f32(approx.get(0).unwrap()),
                    point_to_f32(approx.get(1).unwrap()),
                    point_to_f32(approx.get(2).unwrap()),
                    point_to_f32(approx.get(3).unwrap()),
                ];
                let aspect = aspect_ratio(&order_corners(&corners));
                let aspect_diff = (aspect - expected).abs();
                let score = area / (1.0 + aspect_diff * 10.0);

                if score > best_score {
                    best_score = score;
                    best_quad = Some(corners);
                }
            }
        }

        if best_quad.is_some() {
            return Ok(best_quad);
        }

        // No quadrilateral found; fall back to the bounding box of the
        // largest in-range contour.
        if let Some(contour) = fallback {
            let rect = bounding_rect(&contour)
                .map_err(|e| PipelineError::opencv("bounding_rect", e))?;
            let (x, y, w, h) = (rect.x as f32, rect.y as f32, rect.width as f32, rect.height as f32);
            return Ok(Some([
                Point2f::new(x, y),
                Point2f::new(x + w, y),
                Point2f::new(x + w, y + h),
                Point2f::new(x, y + h),
            ]));
        }

        Ok(None)
    }

    /// Compute homography, pixels-per-cm scale, and rectified output size
    ///
    /// The scale averages the horizontal and vertical edge measurements:
    /// `((avg_width_px / card_w) + (avg_height_px / card_h)) / 2`. The
    /// homography maps the ordered corners onto a canonical rectangle of
    /// `card_w * scale` by `card_h * scale` pixels, fit with a RANSAC
    /// estimator.
    fn compute_transform(&self, corners: &[Point2f; 4]) -> Result<(Mat, f64, Size)> {
        let [tl, tr, br, bl] = corners;

        let avg_width_px = (distance(tl, tr) + distance(bl, br)) / 2.0;
        let avg_height_px = (distance(tl, bl) + distance(tr, br)) / 2.0;

        let scale_w = avg_width_px / self.config.card_width_cm;
        let scale_h = avg_height_px / self.config.card_height_cm;
        let scale = (scale_w + scale_h) / 2.0;

        let dst_width = (self.config.card_width_cm * scale) as i32;
        let dst_height = (self.config.card_height_cm * scale) as i32;
        if dst_width <= 0 || dst_height <= 0 || scale <= 0.0 {
            return Err(PipelineError::Processing(
                "Degenerate card geometry: zero-size canonical rectangle".into(),
            ));
        }

        let mut src = VectorOfPoint2f::new();
        for p in corners {
            src.push(*p);
        }

        let mut dst = VectorOfPoint2f::new();
        dst.push(Point2f::new(0.0, 0.0));
        dst.push(Point2f::new(dst_width as f32, 0.0));
        dst.push(Point2f::new(dst_width as f32, dst_height as f32));
        dst.push(Point2f::new(0.0, dst_height as f32));

        let homography = calib3d::find_homography(
            &src,
            &dst,
            &mut Mat::default(),
            calib3d::RANSAC,
            self.config.ransac_reproj_threshold,
        )
        .map_err(|e| PipelineError::opencv("find_homography", e))?;

        if homography.empty() {
            return Err(PipelineError::Processing(
                "Homography estimation produced an empty matrix".into(),
            ));
        }

        Ok((homography, scale, Size::new(dst_width, dst_height)))
    }
}

/// Order corners canonically: top-left, top-right, bottom-right, bottom-left
///
/// Top-left has the minimal coordinate sum, bottom-right the maximal sum,
/// top-right the minimal x - y difference, bottom-left the maximal.
pub fn order_corners(corners: &[Point2f; 4]) -> [Point2f; 4] {
    let mut by_sum = *corners;
    by_sum.sort_by(|a, b| (a.x + a.y).partial_cmp(&(b.x + b.y)).unwrap());
    let tl = by_sum[0];
    let br = by_sum[3];

    let mut by_diff = *corners;
    by_diff.sort_by(|a, b| (a.x - a.y).partial_cmp(&(b.x - b.y)).unwrap());
    let bl = by_diff[0];
    let tr = by_diff[3];

    [tl, tr, br, bl]
}

/// Aspect ratio (width / height) from ordered corners
fn aspect_ratio(corners: &[Point2f; 4]) -> f64 {
    let [tl, tr, br, bl] = corners;
    let avg_width = (distance(tl, tr) + distance(bl, br)) / 2.0;
    let avg_height = (distance(tl, bl) + distance(tr, br)) / 2.0;

    if avg_height > 0.0 {
        avg_width / avg_height
    } else {
        0.0
    }
}

fn distance(a: &Point2f, b: &Point2f) -> f64 {
    let dx = (a.x - b.x) as f64;
    let dy = (a.y - b.y) as f64;
    (dx * dx + dy * dy).sqrt()
}

fn point_to_f32(p: Point) -> Point2f {
    Point2f::new(p.x as f32, p.y as f32)
}
