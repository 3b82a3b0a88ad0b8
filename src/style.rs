use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::{Entry, LogoUrl};

const BUILTIN_STYLES: &[(&str, &str)] = &[
    ("daylight", include_str!("../styles/daylight.toml")),
    ("midnight", include_str!("../styles/midnight.toml")),
    ("pitch", include_str!("../styles/pitch.toml")),
];

const BACKGROUND_TOP: &str = "#0f172a";
const BACKGROUND_BOTTOM: &str = "#1e293b";
const TEXT: &str = "#f8fafc";
const SECONDARY_TEXT: &str = "#94a3b8";
const ROW: &str = "#1f2a44";
const EMPHASIZED_ROW: &str = "#b91c1c";
const PLACEHOLDER: &str = "#475569";
const OVERLAY: &str = "#000000";

const WIDTH: f32 = 1080.0;
const PADDING_X: f32 = 48.0;
const PADDING_TOP: f32 = 48.0;
const PADDING_BOTTOM: f32 = 48.0;
const TITLE_BLOCK: f32 = 96.0;
const ROW_HEIGHT: f32 = 88.0;
const ROW_GAP: f32 = 12.0;
const EMPHASIS_INCREMENT: f32 = 36.0;
const ROW_PADDING: f32 = 20.0;
const TIME_GUTTER: f32 = 110.0;
const TOURNAMENT_GUTTER: f32 = 170.0;
const LOGO_SIZE: f32 = 52.0;
const LOGO_SPACING: f32 = 14.0;
const CENTER_GAP: f32 = 34.0;
const CORNER_RADIUS: f32 = 16.0;

const FONT_SIZE: f32 = 28.0;
const TITLE_FONT_SIZE: f32 = 48.0;
const TIME_FONT_SIZE: f32 = 26.0;
const TOURNAMENT_FONT_SIZE: f32 = 18.0;
const CAPTION_FONT_SIZE: f32 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TitleAlign {
    Left,
    #[default]
    Center,
    Right,
}

/// Highlight every match involving `team` and print `caption` below it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmphasisRule {
    pub team: String,
    pub caption: String,
}

/// Everything a render call needs besides the entries. Read-only per call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleConfig {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub title_align: TitleAlign,
    #[serde(default = "default_true")]
    pub show_logos: bool,
    #[serde(default = "default_true")]
    pub show_time: bool,

    #[serde(default = "default_background")]
    pub background_color: String,
    #[serde(default = "default_background_end")]
    pub background_color_end: String,
    #[serde(default)]
    pub background_image: Option<LogoUrl>,
    #[serde(default = "default_overlay")]
    pub overlay_color: String,
    #[serde(default = "default_text")]
    pub text_color: String,
    #[serde(default = "default_secondary_text")]
    pub secondary_text_color: String,
    #[serde(default = "default_row")]
    pub row_color: String,
    #[serde(default = "default_emphasized_row")]
    pub emphasized_row_color: String,
    #[serde(default = "default_placeholder")]
    pub placeholder_color: String,

    #[serde(default)]
    pub emphasis: Option<EmphasisRule>,

    #[serde(default = "default_scale")]
    pub scale: f32,
    #[serde(default = "default_width")]
    pub width: f32,
    #[serde(default)]
    pub height: Option<f32>,

    #[serde(default = "default_padding_x")]
    pub padding_x: f32,
    #[serde(default = "default_padding_top")]
    pub padding_top: f32,
    #[serde(default = "default_padding_bottom")]
    pub padding_bottom: f32,
    #[serde(default = "default_title_block")]
    pub title_block: f32,
    #[serde(default = "default_row_height")]
    pub row_height: f32,
    #[serde(default = "default_row_gap")]
    pub row_gap: f32,
    #[serde(default = "default_emphasis_increment")]
    pub emphasis_increment: f32,
    #[serde(default = "default_row_padding")]
    pub row_padding: f32,
    #[serde(default = "default_time_gutter")]
    pub time_gutter: f32,
    #[serde(default = "default_tournament_gutter")]
    pub tournament_gutter: f32,
    #[serde(default = "default_logo_size")]
    pub logo_size: f32,
    #[serde(default = "default_logo_spacing")]
    pub logo_spacing: f32,
    #[serde(default = "default_center_gap")]
    pub center_gap: f32,
    #[serde(default = "default_corner_radius")]
    pub corner_radius: f32,

    #[serde(default = "default_font_size")]
    pub font_size: f32,
    #[serde(default = "default_title_font_size")]
    pub title_font_size: f32,
    #[serde(default = "default_time_font_size")]
    pub time_font_size: f32,
    #[serde(default = "default_tournament_font_size")]
    pub tournament_font_size: f32,
    #[serde(default = "default_caption_font_size")]
    pub caption_font_size: f32,
}

fn default_true() -> bool {
    true
}
fn default_background() -> String {
    BACKGROUND_TOP.to_string()
}
fn default_background_end() -> String {
    BACKGROUND_BOTTOM.to_string()
}
fn default_overlay() -> String {
    OVERLAY.to_string()
}
fn default_text() -> String {
    TEXT.to_string()
}
fn default_secondary_text() -> String {
    SECONDARY_TEXT.to_string()
}
fn default_row() -> String {
    ROW.to_string()
}
fn default_emphasized_row() -> String {
    EMPHASIZED_ROW.to_string()
}
fn default_placeholder() -> String {
    PLACEHOLDER.to_string()
}
fn default_scale() -> f32 {
    1.0
}
fn default_width() -> f32 {
    WIDTH
}
fn default_padding_x() -> f32 {
    PADDING_X
}
fn default_padding_top() -> f32 {
    PADDING_TOP
}
fn default_padding_bottom() -> f32 {
    PADDING_BOTTOM
}
fn default_title_block() -> f32 {
    TITLE_BLOCK
}
fn default_row_height() -> f32 {
    ROW_HEIGHT
}
fn default_row_gap() -> f32 {
    ROW_GAP
}
fn default_emphasis_increment() -> f32 {
    EMPHASIS_INCREMENT
}
fn default_row_padding() -> f32 {
    ROW_PADDING
}
fn default_time_gutter() -> f32 {
    TIME_GUTTER
}
fn default_tournament_gutter() -> f32 {
    TOURNAMENT_GUTTER
}
fn default_logo_size() -> f32 {
    LOGO_SIZE
}
fn default_logo_spacing() -> f32 {
    LOGO_SPACING
}
fn default_center_gap() -> f32 {
    CENTER_GAP
}
fn default_corner_radius() -> f32 {
    CORNER_RADIUS
}
fn default_font_size() -> f32 {
    FONT_SIZE
}
fn default_title_font_size() -> f32 {
    TITLE_FONT_SIZE
}
fn default_time_font_size() -> f32 {
    TIME_FONT_SIZE
}
fn default_tournament_font_size() -> f32 {
    TOURNAMENT_FONT_SIZE
}
fn default_caption_font_size() -> f32 {
    CAPTION_FONT_SIZE
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self::from_builtin("midnight").expect("built-in midnight style must parse")
    }
}

impl StyleConfig {
    pub fn from_builtin(name: &str) -> Result<Self, ConfigError> {
        let normalized = name.trim().to_ascii_lowercase().replace('-', "_");
        let content = BUILTIN_STYLES
            .iter()
            .find(|(n, _)| *n == normalized)
            .map(|(_, c)| *c)
            .ok_or_else(|| ConfigError::UnknownPreset {
                name: name.to_string(),
                available: Self::list_builtins().join(", "),
            })?;
        Self::from_toml(content)
    }

    pub fn list_builtins() -> Vec<&'static str> {
        BUILTIN_STYLES.iter().map(|(n, _)| *n).collect()
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Toml(e.to_string()))
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::Yaml(e.to_string()))
    }

    /// Space above the first row and below the last one.
    pub fn header_offset(&self) -> f32 {
        let title = if self.has_title() { self.title_block } else { 0.0 };
        self.padding_top + title + self.padding_bottom
    }

    pub fn has_title(&self) -> bool {
        self.title.as_deref().is_some_and(|t| !t.trim().is_empty())
    }

    /// Vertical space one row consumes, including the gap below it.
    pub fn row_extent(&self, entry: &Entry) -> f32 {
        let extra = if self.is_emphasized(entry) {
            self.emphasis_increment
        } else {
            0.0
        };
        self.row_height + self.row_gap + extra
    }

    pub fn is_emphasized(&self, entry: &Entry) -> bool {
        match (entry, &self.emphasis) {
            (Entry::Paired(paired), Some(rule)) => paired.involves(&rule.team),
            _ => false,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(format!("scale must be positive, got {}", self.scale));
        }
        if !self.width.is_finite() || self.width <= 0.0 {
            return Err(format!("width must be positive, got {}", self.width));
        }
        if let Some(height) = self.height.filter(|h| !h.is_finite() || *h <= 0.0) {
            return Err(format!("height must be positive, got {}", height));
        }
        Ok(())
    }
}
