//! Seasonal color palette generation
//!
//! Maps skin lightness and undertone onto one of the four canonical
//! color seasons and produces the season's recommended palette: best
//! colors with wear guidance, neutrals, colors to avoid, and metals.

use serde::{Deserialize, Serialize};

use crate::constants::skin;
use crate::skin::analysis::Undertone;

/// Canonical color season
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    /// The undertone canonically associated with this season
    pub fn canonical_undertone(self) -> Undertone {
        match self {
            Season::Spring | Season::Autumn => Undertone::Warm,
            Season::Summer | Season::Winter => Undertone::Cool,
        }
    }
}

impl std::fmt::Display for Season {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Season::Spring => write!(f, "spring"),
            Season::Summer => write!(f, "summer"),
            Season::Autumn => write!(f, "autumn"),
            Season::Winter => write!(f, "winter"),
        }
    }
}

/// Usage category of a palette color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorCategory {
    Primary,
    Accent,
    Neutral,
}

/// One recommended color with wear guidance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaletteColor {
    pub hex: String,
    pub name: String,
    pub reason: String,
    pub category: ColorCategory,
    pub how_to_wear: String,
    pub occasions: Vec<String>,
}

/// One neutral base color
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeutralColor {
    pub hex: String,
    pub name: String,
    pub reason: String,
}

/// Complete seasonal palette recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalPalette {
    pub season: Season,
    pub characteristics: String,
    pub description: String,
    pub best_colors: Vec<PaletteColor>,
    pub neutrals: Vec<NeutralColor>,
    pub avoid: Vec<String>,
    pub metals: Vec<String>,
    pub confidence: f32,
}

type ColorEntry = (&'static str, &'static str, &'static str, ColorCategory);
type NeutralEntry = (&'static str, &'static str, &'static str);

struct SeasonTable {
    characteristics: &'static str,
    description: &'static str,
    best_colors: &'static [ColorEntry],
    neutrals: &'static [NeutralEntry],
    avoid: &'static [&'static str],
    metals: &'static [&'static str],
}

const SPRING: SeasonTable = SeasonTable {
    characteristics: "Warm, bright, clear colors",
    description: "Spring coloring has warm undertones with bright, clear colors",
    best_colors: &[
        ("#FF6B6B", "Coral", "Warm and energizing", ColorCategory::Accent),
        ("#FFD93D", "Golden Yellow", "Bright and cheerful", ColorCategory::Accent),
        ("#6BCB77", "Fresh Green", "Natural and vibrant", ColorCategory::Neutral),
        ("#4D96FF", "Clear Blue", "Bright and fresh", ColorCategory::Primary),
        ("#FF8C42", "Peach", "Warm and flattering", ColorCategory::Accent),
        ("#A8E6CF", "Mint Green", "Soft and fresh", ColorCategory::Neutral),
        ("#FFB6C1", "Light Pink", "Delicate and warm", ColorCategory::Accent),
        ("#87CEEB", "Sky Blue", "Clear and bright", ColorCategory::Primary),
    ],
    neutrals: &[
        ("#F5E6D3", "Warm Beige", "Soft neutral base"),
        ("#D4A574", "Camel", "Warm versatile neutral"),
        ("#FAEBD7", "Antique White", "Soft warm white"),
        ("#8B7355", "Taupe", "Warm neutral brown"),
    ],
    avoid: &["Black", "Dark Brown", "Burgundy", "Navy"],
    metals: &["Gold", "Rose Gold"],
};

const SUMMER: SeasonTable = SeasonTable {
    characteristics: "Cool, soft, muted colors",
    description: "Summer coloring has cool undertones with soft, muted colors",
    best_colors: &[
        ("#B4A7D6", "Lavender", "Soft and elegant", ColorCategory::Primary),
        ("#87CEEB", "Powder Blue", "Cool and calming", ColorCategory::Primary),
        ("#FFB6C1", "Rose Pink", "Soft and romantic", ColorCategory::Accent),
        ("#98D8C8", "Seafoam", "Cool and refreshing", ColorCategory::Neutral),
        ("#E6E6FA", "Periwinkle", "Soft cool blue", ColorCategory::Primary),
        ("#DDA0DD", "Plum", "Muted cool purple", ColorCategory::Accent),
        ("#F0E68C", "Soft Yellow", "Muted warm accent", ColorCategory::Accent),
        ("#D8BFD8", "Thistle", "Soft cool purple", ColorCategory::Neutral),
    ],
    neutrals: &[
        ("#C0C0C0", "Silver Gray", "Cool elegant neutral"),
        ("#E6E6FA", "Soft White", "Cool white base"),
        ("#A9A9A9", "Cool Gray", "Versatile cool neutral"),
        ("#778899", "Slate Gray", "Sophisticated cool gray"),
    ],
    avoid: &["Orange", "Bright Yellow", "Black", "Rust"],
    metals: &["Silver", "White Gold", "Platinum"],
};

const AUTUMN: SeasonTable = SeasonTable {
    characteristics: "Warm, rich, earthy colors",
    description: "Autumn coloring has warm undertones with rich, earthy tones",
    best_colors: &[
        ("#8B4513", "Saddle Brown", "Rich and warm", ColorCategory::Neutral),
        ("#DAA520", "Goldenrod", "Warm golden tone", ColorCategory::Accent),
        ("#CD853F", "Peru", "Warm earthy brown", ColorCategory::Neutral),
        ("#556B2F", "Olive Green", "Rich earthy green", ColorCategory::Primary),
        ("#B8860B", "Dark Goldenrod", "Deep warm gold", ColorCategory::Accent),
        ("#A0522D", "Sienna", "Warm reddish brown", ColorCategory::Neutral),
        ("#D2691E", "Chocolate", "Rich warm brown", ColorCategory::Primary),
        ("#BC8F8F", "Rosy Brown", "Warm muted rose", ColorCategory::Accent),
    ],
    neutrals: &[
        ("#8B7355", "Warm Taupe", "Earthy warm neutral"),
        ("#D2B48C", "Tan", "Warm beige neutral"),
        ("#F5DEB3", "Wheat", "Soft warm neutral"),
        ("#A0522D", "Sienna", "Rich warm brown"),
    ],
    avoid: &["Black", "Bright Pink", "Icy Blue", "Pure White"],
    metals: &["Gold", "Bronze", "Copper"],
};

const WINTER: SeasonTable = SeasonTable {
    characteristics: "Cool, bright, clear colors",
    description: "Winter coloring has cool undertones with bright, clear, bold colors",
    best_colors: &[
        ("#000000", "True Black", "Bold and dramatic", ColorCategory::Neutral),
        ("#FFFFFF", "Pure White", "Crisp and clean", ColorCategory::Neutral),
        ("#FF0000", "True Red", "Bold and striking", ColorCategory::Accent),
        ("#0000FF", "Royal Blue", "Deep cool blue", ColorCategory::Primary),
        ("#FF1493", "Hot Pink", "Bold cool pink", ColorCategory::Accent),
        ("#8B008B", "Dark Magenta", "Rich cool purple", ColorCategory::Primary),
        ("#4B0082", "Indigo", "Deep cool purple", ColorCategory::Primary),
        ("#00CED1", "Dark Turquoise", "Bright cool blue", ColorCategory::Accent),
    ],
    neutrals: &[
        ("#000000", "Black", "Classic cool neutral"),
        ("#FFFFFF", "White", "Pure cool white"),
        ("#708090", "Slate Gray", "Cool sophisticated gray"),
        ("#2F4F4F", "Dark Slate Gray", "Deep cool gray"),
    ],
    avoid: &["Orange", "Gold", "Beige", "Warm Browns"],
    metals: &["Silver", "Platinum", "White Gold"],
};

fn table(season: Season) -> &'static SeasonTable {
    match season {
        Season::Spring => &SPRING,
        Season::Summer => &SUMMER,
        Season::Autumn => &AUTUMN,
        Season::Winter => &WINTER,
    }
}

/// Seasonal palette generator
pub struct PaletteGenerator;

impl Default for PaletteGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl PaletteGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Determine the color season from skin characteristics
    ///
    /// Light (`L > 60`) and warm maps to spring, light and cool to summer,
    /// dark and warm to autumn, dark and cool to winter. A neutral
    /// undertone falls back to ITA bands.
    pub fn determine_season(&self, ita: f32, undertone: Undertone, l: f32) -> Season {
        let is_light = l > 60.0;

        let season = match undertone {
            Undertone::Warm if is_light => Season::Spring,
            Undertone::Cool if is_light => Season::Summer,
            Undertone::Warm => Season::Autumn,
            Undertone::Cool => Season::Winter,
            Undertone::Neutral => {
                if ita > 28.0 {
                    Season::Summer
                } else if ita > -30.0 {
                    Season::Spring
                } else {
                    Season::Autumn
                }
            }
        };

        log::info!(
            "Determined season: {} (ITA={:.1}, undertone={})",
            season,
            ita,
            undertone
        );

        season
    }

    /// Generate the personalized palette for a season
    pub fn generate(&self, season: Season, undertone: Undertone) -> SeasonalPalette {
        let table = table(season);

        let best_colors = table
            .best_colors
            .iter()
            .map(|(hex, name, reason, category)| PaletteColor {
                hex: (*hex).to_string(),
                name: (*name).to_string(),
                reason: (*reason).to_string(),
                category: *category,
                how_to_wear: styling_tip(*category, table.metals[0]),
                occasions: occasions(*category),
            })
            .collect();

        let neutrals = table
            .neutrals
            .iter()
            .map(|(hex, name, reason)| NeutralColor {
                hex: (*hex).to_string(),
                name: (*name).to_string(),
                reason: (*reason).to_string(),
            })
            .collect();

        SeasonalPalette {
            season,
            characteristics: table.characteristics.to_string(),
            description: table.description.to_string(),
            best_colors,
            neutrals,
            avoid: table.avoid.iter().map(|s| s.to_string()).collect(),
            metals: table.metals.iter().map(|s| s.to_string()).collect(),
            confidence: self.palette_confidence(season, undertone),
        }
    }

    /// Confidence in the palette recommendation
    fn palette_confidence(&self, season: Season, undertone: Undertone) -> f32 {
        let mut confidence = skin::PALETTE_BASE_CONFIDENCE;
        if season.canonical_undertone() == undertone {
            confidence += skin::PALETTE_UNDERTONE_BONUS;
        }
        confidence.min(1.0)
    }
}

fn styling_tip(category: ColorCategory, first_metal: &str) -> String {
    match category {
        ColorCategory::Primary => format!(
            "Perfect as a main color for dresses, suits, or statement pieces. \
             Pair with {} jewelry.",
            first_metal.to_lowercase()
        ),
        ColorCategory::Accent => {
            "Great for accessories, scarves, or accent pieces. Use to add pops of color \
             to neutral outfits."
                .to_string()
        }
        ColorCategory::Neutral => {
            "Versatile base color for everyday wear. Pairs well with all your best colors."
                .to_string()
        }
    }
}

fn occasions(category: ColorCategory) -> Vec<String> {
    let list: &[&str] = match category {
        ColorCategory::Primary => &["formal events", "business meetings", "important occasions"],
        ColorCategory::Accent => &["casual outings", "date night", "social events"],
        ColorCategory::Neutral => &["everyday wear", "work", "versatile occasions"],
    };
    list.iter().map(|s| s.to_string()).collect()
}
