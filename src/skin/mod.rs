//! Skin tone analysis module
//!
//! This module analyzes color-calibrated skin patches: perceptual Lab
//! values, the Individual Typology Angle, Monk scale bucket, undertone
//! classification with confidence, and a seasonal color palette.

pub mod analysis;
pub mod palette;
pub mod regions;

pub use analysis::{LabColor, SkinAnalyzer, SkinProfile, ToneCategory, Undertone};
pub use regions::{extract_skin_patches, Region, SkinPatch};
pub use self::palette::{PaletteGenerator, Season, SeasonalPalette};
