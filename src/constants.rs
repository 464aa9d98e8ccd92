//! Calibration constants and reference values for capture processing
//!
//! This module contains compile-time constants for geometric and color
//! calibration, skin tone classification, and measurement heuristics.

/// Reference card geometry
pub mod card {
    /// Default physical card width in cm (standard reference card)
    pub const WIDTH_CM: f64 = 8.5;

    /// Default physical card height in cm
    pub const HEIGHT_CM: f64 = 5.5;

    /// Default scale applied when no card is detected (pixels per cm)
    pub const DEFAULT_SCALE: f64 = 10.0;
}

/// Standard reference patch colors for color calibration
///
/// First six patches of the X-Rite ColorChecker, sRGB.
/// Source: X-Rite ColorChecker Classic specification.
pub mod reference_patches {
    /// Reference patch colors in RGB order
    pub const COLORS: [[f32; 3]; 6] = [
        [115.0, 82.0, 68.0],   // dark skin
        [194.0, 150.0, 130.0], // light skin
        [98.0, 122.0, 157.0],  // blue sky
        [87.0, 108.0, 67.0],   // foliage
        [133.0, 128.0, 177.0], // blue flower
        [103.0, 189.0, 170.0], // bluish green
    ];

    /// Number of patches extracted from a rectified card
    pub const PATCH_COUNT: usize = 6;
}

/// Individual Typology Angle category thresholds in degrees
///
/// Bands follow the Chardon ITA classification.
pub mod ita {
    pub const VERY_LIGHT: f32 = 55.0;
    pub const LIGHT: f32 = 41.0;
    pub const INTERMEDIATE: f32 = 28.0;
    pub const TAN: f32 = 19.0;
    pub const BROWN: f32 = 10.0;

    /// Substitute for a zero b* channel to keep the angle finite
    pub const B_EPSILON: f32 = 0.001;
}

/// Monk Skin Tone scale lightness bands
pub mod monk {
    /// Descending L* thresholds; index i maps to bucket i+1, values below
    /// the last threshold map to bucket 10
    pub const L_THRESHOLDS: [f32; 9] = [80.0, 70.0, 60.0, 55.0, 50.0, 45.0, 40.0, 35.0, 30.0];
}

/// Undertone voting weights
pub mod undertone {
    /// Lab b* vote weight when decisive (|b| > 5)
    pub const LAB_B_DECISIVE: f32 = 0.8;
    /// Lab b* vote weight when neutral
    pub const LAB_B_NEUTRAL: f32 = 0.6;
    /// RGB dominance vote weight when decisive
    pub const RGB_DECISIVE: f32 = 0.7;
    /// RGB dominance vote weight when neutral
    pub const RGB_NEUTRAL: f32 = 0.5;
    /// Lab a* vote weight when decisive
    pub const LAB_A_DECISIVE: f32 = 0.6;
    /// Lab a* vote weight when neutral
    pub const LAB_A_NEUTRAL: f32 = 0.5;

    /// Red-over-green margin for a warm RGB vote
    pub const RED_GREEN_MARGIN: f32 = 15.0;
}

/// Measurement heuristics
pub mod measurement {
    /// Nose-to-crown correction applied to the nose-to-ankle span
    pub const HEAD_OFFSET_FACTOR: f64 = 1.1;

    /// Chest width as a fraction of shoulder width
    pub const CHEST_SHOULDER_RATIO: f64 = 0.9;

    /// Waist width as a fraction of hip width
    pub const WAIST_HIP_RATIO: f64 = 0.75;

    /// Assumed body depth as a fraction of width when no side view exists
    pub const DEPTH_WIDTH_RATIO: f64 = 0.7;

    /// Neck circumference as a fraction of shoulder width
    pub const NECK_SHOULDER_RATIO: f64 = 0.9;
}

/// Skin analysis parameters
pub mod skin {
    /// Minimum mask pixels for a region to qualify as a skin patch
    pub const MIN_REGION_PIXELS: i32 = 100;

    /// Divisor normalizing channel stddev into a uniformity score
    pub const UNIFORMITY_STDDEV_DIVISOR: f32 = 50.0;

    /// Confidence bonus applied when the input was card-calibrated
    pub const CALIBRATION_BONUS: f32 = 0.15;

    /// Base confidence of a seasonal palette recommendation
    pub const PALETTE_BASE_CONFIDENCE: f32 = 0.8;

    /// Bonus when the undertone matches the season's canonical undertone
    pub const PALETTE_UNDERTONE_BONUS: f32 = 0.15;
}
