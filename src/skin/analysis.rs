//! Skin tone analysis
//!
//! Computes perceptual Lab values, the Individual Typology Angle, Monk
//! scale bucket, undertone classification via weighted voting, seasonal
//! palette, and an overall confidence for one or more skin patches.

use palette::Lab;
use serde::{Deserialize, Serialize};

use crate::color::conversion::{masked_mean_std_bgr, ColorConverter};
use crate::config::SkinAnalysisConfig;
use crate::constants::{ita as ita_const, monk, undertone as vote};
use crate::skin::palette::{NeutralColor, PaletteColor, PaletteGenerator, Season};
use crate::skin::regions::SkinPatch;
use crate::Result;

/// Skin undertone classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Undertone {
    Warm,
    Cool,
    Neutral,
}

impl std::fmt::Display for Undertone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Undertone::Warm => write!(f, "warm"),
            Undertone::Cool => write!(f, "cool"),
            Undertone::Neutral => write!(f, "neutral"),
        }
    }
}

/// Skin tone lightness category from the ITA angle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToneCategory {
    VeryLight,
    Light,
    Intermediate,
    Tan,
    Brown,
    Dark,
}

/// Lab color for serialized profiles
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabColor {
    #[serde(rename = "L")]
    pub l: f32,
    pub a: f32,
    pub b: f32,
}

/// Complete skin tone profile for a capture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkinProfile {
    pub lab: LabColor,
    /// Display hex of the averaged skin color
    pub hex: String,
    /// Individual Typology Angle in degrees
    pub ita: f32,
    pub category: ToneCategory,
    /// Monk Skin Tone scale bucket (1-10)
    pub monk_bucket: u8,
    pub undertone: Undertone,
    pub undertone_confidence: f32,
    pub season: Season,
    pub palette: Vec<PaletteColor>,
    pub neutrals: Vec<NeutralColor>,
    pub avoid_colors: Vec<String>,
    pub recommended_metals: Vec<String>,
    /// Overall analysis confidence (0.0-1.0)
    pub confidence: f32,
    /// Whether the input was card-calibrated
    pub calibrated: bool,
}

/// Outcome of the undertone weighted vote
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UndertoneVote {
    pub undertone: Undertone,
    /// Winner weight over total weight (0.0-1.0)
    pub confidence: f32,
    pub warm_weight: f32,
    pub cool_weight: f32,
    pub neutral_weight: f32,
}

/// Individual Typology Angle in degrees
///
/// `ita = atan((L - 50) / b) * 180 / pi`; a zero b* channel is replaced
/// with a small epsilon to keep the angle finite.
pub fn ita(l: f32, b: f32) -> f32 {
    let b = if b == 0.0 { ita_const::B_EPSILON } else { b };
    ((l - 50.0) / b).atan().to_degrees()
}

/// Skin tone category from the ITA angle
pub fn tone_category(ita: f32) -> ToneCategory {
    if ita > ita_const::VERY_LIGHT {
        ToneCategory::VeryLight
    } else if ita > ita_const::LIGHT {
        ToneCategory::Light
    } else if ita > ita_const::INTERMEDIATE {
        ToneCategory::Intermediate
    } else if ita > ita_const::TAN {
        ToneCategory::Tan
    } else if ita > ita_const::BROWN {
        ToneCategory::Brown
    } else {
        ToneCategory::Dark
    }
}

/// Monk Skin Tone scale bucket (1-10) from perceptual lightness
pub fn monk_bucket(l: f32) -> u8 {
    for (i, threshold) in monk::L_THRESHOLDS.iter().enumerate() {
        if l >= *threshold {
            return (i + 1) as u8;
        }
    }
    10
}

/// Undertone via weighted voting over three independent signals
///
/// Each signal votes warm/cool/neutral with its own weight: the Lab b*
/// channel, RGB channel dominance, and the Lab a* channel. The winner is
/// the label with the highest summed weight; confidence is the winner's
/// share of the total weight.
pub fn detect_undertone(a: f32, b: f32, rgb: [f32; 3]) -> UndertoneVote {
    let mut votes: [(Undertone, f32); 3] = [(Undertone::Neutral, 0.0); 3];

    // Signal 1: Lab b* (blue-yellow axis)
    votes[0] = if b < -5.0 {
        (Undertone::Cool, vote::LAB_B_DECISIVE)
    } else if b > 5.0 {
        (Undertone::Warm, vote::LAB_B_DECISIVE)
    } else {
        (Undertone::Neutral, vote::LAB_B_NEUTRAL)
    };

    // Signal 2: RGB channel dominance
    let [r, g, b_rgb] = rgb;
    votes[1] = if r > g && r > b_rgb {
        if r - g > vote::RED_GREEN_MARGIN {
            (Undertone::Warm, vote::RGB_DECISIVE)
        } else {
            (Undertone::Neutral, vote::RGB_NEUTRAL)
        }
    } else {
        (Undertone::Cool, vote::RGB_DECISIVE)
    };

    // Signal 3: Lab a* (red-green axis)
    votes[2] = if a > 5.0 {
        (Undertone::Warm, vote::LAB_A_DECISIVE)
    } else if a < -2.0 {
        (Undertone::Cool, vote::LAB_A_DECISIVE)
    } else {
        (Undertone::Neutral, vote::LAB_A_NEUTRAL)
    };

    let mut warm = 0.0f32;
    let mut cool = 0.0f32;
    let mut neutral = 0.0f32;
    for (undertone, weight) in votes {
        match undertone {
            Undertone::Warm => warm += weight,
            Undertone::Cool => cool += weight,
            Undertone::Neutral => neutral += weight,
        }
    }
    let total = warm + cool + neutral;

    let (undertone, winner) = if warm >= cool && warm >= neutral {
        (Undertone::Warm, warm)
    } else if cool >= warm && cool >= neutral {
        (Undertone::Cool, cool)
    } else {
        (Undertone::Neutral, neutral)
    };

    UndertoneVote {
        undertone,
        confidence: if total > 0.0 { winner / total } else { 0.5 },
        warm_weight: warm,
        cool_weight: cool,
        neutral_weight: neutral,
    }
}

/// Per-patch color statistics
struct PatchStats {
    rgb: [f32; 3],
    l: f32,
    a: f32,
    b: f32,
    ita: f32,
    uniformity: f32,
}

/// Skin tone analyzer over calibrated skin patches
pub struct SkinAnalyzer {
    config: SkinAnalysisConfig,
    converter: ColorConverter,
    palette_gen: PaletteGenerator,
}

impl SkinAnalyzer {
    /// Create an analyzer with the given configuration
    pub fn new(config: SkinAnalysisConfig) -> Self {
        Self {
            config,
            converter: ColorConverter::new(),
            palette_gen: PaletteGenerator::new(),
        }
    }

    /// Analyze one or more skin patches into a profile
    ///
    /// Lab values and the ITA angle are averaged across patches before the
    /// discrete classifications are recomputed; categories are never
    /// averaged directly.
    ///
    /// # Arguments
    ///
    /// * `patches` - Color-calibrated skin patches
    /// * `calibrated` - Whether the capture was card-calibrated
    ///
    /// # Returns
    ///
    /// `None` when no patch contains usable skin pixels; the pipeline
    /// continues without a skin profile in that case.
    pub fn analyze(&self, patches: &[SkinPatch], calibrated: bool) -> Result<Option<SkinProfile>> {
        let mut stats = Vec::with_capacity(patches.len());
        for patch in patches {
            if let Some(s) = self.patch_stats(patch)? {
                stats.push(s);
            }
        }

        if stats.is_empty() {
            log::warn!("No usable skin patches; skipping skin analysis");
            return Ok(None);
        }

        let n = stats.len() as f32;
        let avg_l = stats.iter().map(|s| s.l).sum::<f32>() / n;
        let avg_a = stats.iter().map(|s| s.a).sum::<f32>() / n;
        let avg_b = stats.iter().map(|s| s.b).sum::<f32>() / n;
        let avg_ita = stats.iter().map(|s| s.ita).sum::<f32>() / n;
        let avg_uniformity = stats.iter().map(|s| s.uniformity).sum::<f32>() / n;
        let avg_rgb = [
            stats.iter().map(|s| s.rgb[0]).sum::<f32>() / n,
            stats.iter().map(|s| s.rgb[1]).sum::<f32>() / n,
            stats.iter().map(|s| s.rgb[2]).sum::<f32>() / n,
        ];

        let category = tone_category(avg_ita);
        let bucket = monk_bucket(avg_l);
        let vote = detect_undertone(avg_a, avg_b, avg_rgb);
        let season = self
            .palette_gen
            .determine_season(avg_ita, vote.undertone, avg_l);
        let palette = self.palette_gen.generate(season, vote.undertone);

        let calibration_bonus = if calibrated {
            self.config.calibration_bonus
        } else {
            0.0
        };
        let confidence = (avg_uniformity * 0.5
            + vote.confidence * 0.3
            + palette.confidence * 0.2
            + calibration_bonus)
            .min(1.0);

        log::info!(
            "Skin analysis: ITA={:.2}, season={}, undertone={} ({:.0}%)",
            avg_ita,
            season,
            vote.undertone,
            vote.confidence * 100.0
        );

        Ok(Some(SkinProfile {
            lab: LabColor {
                l: avg_l,
                a: avg_a,
                b: avg_b,
            },
            hex: self.converter.lab_to_hex(Lab::new(avg_l, avg_a, avg_b)),
            ita: avg_ita,
            category,
            monk_bucket: bucket,
            undertone: vote.undertone,
            undertone_confidence: vote.confidence,
            season,
            palette: palette.best_colors,
            neutrals: palette.neutrals,
            avoid_colors: palette.avoid,
            recommended_metals: palette.metals,
            confidence,
            calibrated,
        }))
    }

    /// Color statistics for one patch, over its mask pixels only
    fn patch_stats(&self, patch: &SkinPatch) -> Result<Option<PatchStats>> {
        let stats = match masked_mean_std_bgr(&patch.image, Some(&patch.mask))? {
            Some(stats) => stats,
            None => return Ok(None),
        };
        let (mean_bgr, std_bgr) = stats;

        let rgb = [mean_bgr[2], mean_bgr[1], mean_bgr[0]];
        let lab = self.converter.rgb_to_lab(rgb[0], rgb[1], rgb[2]);

        let avg_std = (std_bgr[0] + std_bgr[1] + std_bgr[2]) / 3.0;
        let uniformity = (1.0 - avg_std / self.config.uniformity_stddev_divisor).max(0.0);

        Ok(Some(PatchStats {
            rgb,
            l: lab.l,
            a: lab.a,
            b: lab.b,
            ita: ita(lab.l, lab.b),
            uniformity,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::skin::regions::Region;
    use opencv::core::{Mat, Scalar, CV_8UC1, CV_8UC3};

    fn analyzer() -> SkinAnalyzer {
        SkinAnalyzer::new(PipelineConfig::default().skin_analysis)
    }

    fn uniform_patch(b: f64, g: f64, r: f64) -> SkinPatch {
        let image = Mat::new_rows_cols_with_default(
            20,
            20,
            CV_8UC3,
            Scalar::new(b, g, r, 0.0),
        )
        .unwrap();
        let mask =
            Mat::new_rows_cols_with_default(20, 20, CV_8UC1, Scalar::all(255.0)).unwrap();
        SkinPatch {
            region: Region::Face,
            image,
            mask,
        }
    }

    #[test]
    fn test_ita_zero_b_is_finite() {
        let angle = ita(60.0, 0.0);
        assert!(angle.is_finite());
        // Positive numerator over tiny positive epsilon approaches +90
        assert!(angle > 89.0);
    }

    #[test]
    fn test_ita_monotonic_in_l_for_positive_b() {
        let b = 12.0;
        let mut prev = ita(10.0, b);
        for l in [20.0, 35.0, 50.0, 65.0, 80.0, 95.0] {
            let current = ita(l, b);
            assert!(current > prev, "ita not increasing at L={l}");
            prev = current;
        }
    }

    #[test]
    fn test_ita_monotonic_decreasing_in_b_for_light_skin() {
        let l = 70.0;
        let mut prev = ita(l, 1.0);
        for b in [5.0, 10.0, 20.0, 40.0, 80.0] {
            let current = ita(l, b);
            assert!(current < prev, "ita not decreasing at b={b}");
            prev = current;
        }
    }

    #[test]
    fn test_tone_category_thresholds() {
        assert_eq!(tone_category(60.0), ToneCategory::VeryLight);
        assert_eq!(tone_category(50.0), ToneCategory::Light);
        assert_eq!(tone_category(30.0), ToneCategory::Intermediate);
        assert_eq!(tone_category(25.0), ToneCategory::Tan);
        assert_eq!(tone_category(15.0), ToneCategory::Brown);
        assert_eq!(tone_category(5.0), ToneCategory::Dark);
        assert_eq!(tone_category(-20.0), ToneCategory::Dark);
    }

    #[test]
    fn test_monk_bucket_boundaries_exact() {
        assert_eq!(monk_bucket(80.0), 1);
        assert_eq!(monk_bucket(79.999), 2);
        assert_eq!(monk_bucket(70.0), 2);
        assert_eq!(monk_bucket(60.0), 3);
        assert_eq!(monk_bucket(30.0), 9);
        assert_eq!(monk_bucket(29.999), 10);
        assert_eq!(monk_bucket(0.0), 10);
    }

    #[test]
    fn test_undertone_confidence_bounds() {
        let cases = [
            (10.0, 20.0, [200.0, 150.0, 120.0]),
            (-5.0, -10.0, [120.0, 150.0, 200.0]),
            (0.0, 0.0, [150.0, 150.0, 150.0]),
            (8.0, -12.0, [180.0, 170.0, 190.0]),
        ];
        for (a, b, rgb) in cases {
            let vote = detect_undertone(a, b, rgb);
            assert!(vote.confidence >= 0.0 && vote.confidence <= 1.0);
            let winner = match vote.undertone {
                Undertone::Warm => vote.warm_weight,
                Undertone::Cool => vote.cool_weight,
                Undertone::Neutral => vote.neutral_weight,
            };
            assert!(
                winner >= vote.warm_weight
                    && winner >= vote.cool_weight
                    && winner >= vote.neutral_weight,
                "winner weight below a competitor"
            );
        }
    }

    #[test]
    fn test_undertone_all_warm_signals() {
        // Lab b > 5, red dominant by > 15, Lab a > 5: unanimous warm
        let vote = detect_undertone(13.0, 17.0, [194.0, 150.0, 130.0]);
        assert_eq!(vote.undertone, Undertone::Warm);
        assert!((vote.confidence - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_analyze_light_skin_patch_is_warm_spring() {
        // Reference light-skin patch color, RGB (194, 150, 130)
        let patch = uniform_patch(130.0, 150.0, 194.0);
        let profile = analyzer().analyze(&[patch], true).unwrap().unwrap();

        assert_eq!(profile.undertone, Undertone::Warm);
        assert_eq!(profile.season, Season::Spring);
        assert!(profile.hex.starts_with('#') && profile.hex.len() == 7);
        assert!(!profile.palette.is_empty());
        assert_eq!(
            profile.avoid_colors,
            vec!["Black", "Dark Brown", "Burgundy", "Navy"]
        );
        assert!(profile.confidence > 0.8);
        assert!(profile.calibrated);
    }

    #[test]
    fn test_analyze_no_patches_is_none() {
        let profile = analyzer().analyze(&[], false).unwrap();
        assert!(profile.is_none());
    }

    #[test]
    fn test_analyze_empty_mask_is_none() {
        let mut patch = uniform_patch(130.0, 150.0, 194.0);
        patch.mask =
            Mat::new_rows_cols_with_default(20, 20, CV_8UC1, Scalar::all(0.0)).unwrap();
        let profile = analyzer().analyze(&[patch], false).unwrap();
        assert!(profile.is_none());
    }

    #[test]
    fn test_multi_patch_averages_lab_before_classifying() {
        let light = uniform_patch(130.0, 150.0, 194.0);
        let darker = uniform_patch(60.0, 80.0, 120.0);
        let profile = analyzer()
            .analyze(&[light.clone(), darker], false)
            .unwrap()
            .unwrap();

        let light_only = analyzer().analyze(&[light], false).unwrap().unwrap();
        // Averaged profile must sit below the light-only profile in L
        assert!(profile.lab.l < light_only.lab.l);
        assert!(profile.monk_bucket >= light_only.monk_bucket);
    }

    #[test]
    fn test_uniform_patch_has_full_uniformity_confidence() {
        let patch = uniform_patch(130.0, 150.0, 194.0);
        let profile = analyzer().analyze(&[patch], false).unwrap().unwrap();
        // Uniform patch: stddev 0, undertone unanimous, palette matched
        // season; only the missing calibration bonus keeps this below 1.0
        assert!(profile.confidence > 0.85);
    }
}
