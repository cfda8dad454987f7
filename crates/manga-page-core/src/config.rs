use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{MangaError, Result};

/// Stylization pipelines.
///   - `LineArt` is pipeline A: CLAHE luminance masked by adaptive-threshold line art
///   - `CelShade` is pipeline B: repeated bilateral smoothing with black edge lines
///   - `EdgePreserve` is pipeline C: one recursive edge-preserving pass (comic look)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Style {
    LineArt,
    CelShade,
    EdgePreserve,
}

impl Style {
    pub const ALL: [Style; 3] = [Style::LineArt, Style::CelShade, Style::EdgePreserve];

    pub fn name(&self) -> &'static str {
        match self {
            Style::LineArt => "line_art",
            Style::CelShade => "cel_shade",
            Style::EdgePreserve => "edge_preserve",
        }
    }
}

impl FromStr for Style {
    type Err = MangaError;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "a" | "line_art" | "lineart" => Ok(Self::LineArt),
            "b" | "cel_shade" | "celshade" | "cel" => Ok(Self::CelShade),
            "c" | "edge_preserve" | "edgepreserve" | "comic" => Ok(Self::EdgePreserve),
            other => Err(MangaError::UnknownStyle(other.to_string())),
        }
    }
}

/// Thresholds for the frame admission check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QualityConfig {
    /// Minimum Laplacian variance to count as sharp.
    #[serde(default = "default_blur_threshold")]
    pub blur_threshold: f64,
    /// Minimum mean luminance (0..=255).
    #[serde(default = "default_brightness_threshold")]
    pub brightness_threshold: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            blur_threshold: default_blur_threshold(),
            brightness_threshold: default_brightness_threshold(),
        }
    }
}

impl QualityConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.blur_threshold.is_finite() || !self.brightness_threshold.is_finite() {
            return Err(MangaError::InvalidConfig(format!(
                "quality thresholds must be finite (blur={}, brightness={})",
                self.blur_threshold, self.brightness_threshold
            )));
        }
        Ok(())
    }
}

/// Panel layout tunables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayoutConfig {
    /// Page width in pixels.
    #[serde(default = "default_page_width")]
    pub page_width: u32,
    /// Page height in pixels.
    #[serde(default = "default_page_height")]
    pub page_height: u32,
    /// Number of panels to generate.
    #[serde(default = "default_panel_count")]
    pub panel_count: usize,
    /// Seed for reproducible layouts. None draws from OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Standard deviation of the split ratio around 0.5.
    #[serde(default = "default_split_std_dev")]
    pub split_std_dev: f64,
    /// Pixels shaved off every side of every panel.
    #[serde(default = "default_margin")]
    pub margin: u32,
    /// Lower clamp for the split ratio; the upper clamp is `1 - min_split_ratio`.
    #[serde(default = "default_min_split_ratio")]
    pub min_split_ratio: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            page_width: default_page_width(),
            page_height: default_page_height(),
            panel_count: default_panel_count(),
            seed: None,
            split_std_dev: default_split_std_dev(),
            margin: default_margin(),
            min_split_ratio: default_min_split_ratio(),
        }
    }
}

impl LayoutConfig {
    /// Validates the layout parameters.
    ///
    /// Returns an error if:
    /// - Page dimensions are zero
    /// - `split_std_dev` is negative or not finite
    /// - `min_split_ratio` is outside `(0, 0.5]`
    pub fn validate(&self) -> Result<()> {
        if self.page_width == 0 || self.page_height == 0 {
            return Err(MangaError::InvalidConfig(format!(
                "page dimensions must be non-zero ({}x{})",
                self.page_width, self.page_height
            )));
        }
        if !self.split_std_dev.is_finite() || self.split_std_dev < 0.0 {
            return Err(MangaError::InvalidConfig(format!(
                "split_std_dev must be a finite value >= 0 (got {})",
                self.split_std_dev
            )));
        }
        if !(self.min_split_ratio > 0.0 && self.min_split_ratio <= 0.5) {
            return Err(MangaError::InvalidConfig(format!(
                "min_split_ratio must be in (0, 0.5] (got {})",
                self.min_split_ratio
            )));
        }
        Ok(())
    }
}

/// Full configuration of the frames-to-page pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageConfig {
    #[serde(default)]
    pub quality: QualityConfig,
    /// Page geometry. `layout.panel_count` is overwritten by the number of
    /// frames that make it onto the page.
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default = "default_style")]
    pub style: Style,
    /// Upper bound on panels per page; accepted frames are sampled evenly.
    #[serde(default)]
    pub max_panels: Option<usize>,
    /// Page fill color (RGB).
    #[serde(default = "default_background")]
    pub background: [u8; 3],
    /// Draw 1px outlines around each panel (debug).
    #[serde(default)]
    pub panel_outlines: bool,
    /// Screen and stylize frames in parallel when feature "parallel" is on.
    #[serde(default)]
    pub parallel: bool,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            quality: QualityConfig::default(),
            layout: LayoutConfig::default(),
            style: default_style(),
            max_panels: None,
            background: default_background(),
            panel_outlines: false,
            parallel: false,
        }
    }
}

impl PageConfig {
    pub fn validate(&self) -> Result<()> {
        self.quality.validate()?;
        self.layout.validate()?;
        if self.max_panels == Some(0) {
            return Err(MangaError::InvalidConfig(
                "max_panels must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn default_blur_threshold() -> f64 {
    100.0
}
fn default_brightness_threshold() -> f64 {
    50.0
}
fn default_page_width() -> u32 {
    1000
}
fn default_page_height() -> u32 {
    1400
}
fn default_panel_count() -> usize {
    8
}
fn default_split_std_dev() -> f64 {
    0.1
}
fn default_margin() -> u32 {
    10
}
fn default_min_split_ratio() -> f64 {
    0.3
}
fn default_style() -> Style {
    Style::LineArt
}
fn default_background() -> [u8; 3] {
    [255, 255, 255]
}

/// Parses a page background color: a few names (`white`, `black`, `gray`/`grey`)
/// or hex in `#rrggbb` / `#rgb` form.
pub fn parse_color(s: &str) -> Result<[u8; 3]> {
    let v = s.trim().to_ascii_lowercase();
    match v.as_str() {
        "white" => return Ok([255, 255, 255]),
        "black" => return Ok([0, 0, 0]),
        "gray" | "grey" => return Ok([128, 128, 128]),
        _ => {}
    }
    let hex = v
        .strip_prefix('#')
        .ok_or_else(|| MangaError::InvalidInput(format!("unknown color: {s}")))?;
    let bad = || MangaError::InvalidInput(format!("invalid hex color: {s}"));
    if !hex.is_ascii() {
        return Err(bad());
    }
    match hex.len() {
        6 => {
            let mut out = [0u8; 3];
            for (i, c) in out.iter_mut().enumerate() {
                *c = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).map_err(|_| bad())?;
            }
            Ok(out)
        }
        3 => {
            let mut out = [0u8; 3];
            for (i, c) in out.iter_mut().enumerate() {
                let d = u8::from_str_radix(&hex[i..i + 1], 16).map_err(|_| bad())?;
                *c = d * 17;
            }
            Ok(out)
        }
        _ => Err(bad()),
    }
}

/// Builder for `PageConfig` for ergonomic construction.
#[derive(Debug, Default, Clone)]
pub struct PageConfigBuilder {
    cfg: PageConfig,
}

impl PageConfigBuilder {
    pub fn new() -> Self {
        Self {
            cfg: PageConfig::default(),
        }
    }
    pub fn with_page_dimensions(mut self, w: u32, h: u32) -> Self {
        self.cfg.layout.page_width = w;
        self.cfg.layout.page_height = h;
        self
    }
    pub fn blur_threshold(mut self, v: f64) -> Self {
        self.cfg.quality.blur_threshold = v;
        self
    }
    pub fn brightness_threshold(mut self, v: f64) -> Self {
        self.cfg.quality.brightness_threshold = v;
        self
    }
    pub fn seed(mut self, v: Option<u64>) -> Self {
        self.cfg.layout.seed = v;
        self
    }
    pub fn split_std_dev(mut self, v: f64) -> Self {
        self.cfg.layout.split_std_dev = v;
        self
    }
    pub fn margin(mut self, v: u32) -> Self {
        self.cfg.layout.margin = v;
        self
    }
    pub fn min_split_ratio(mut self, v: f64) -> Self {
        self.cfg.layout.min_split_ratio = v;
        self
    }
    pub fn style(mut self, v: Style) -> Self {
        self.cfg.style = v;
        self
    }
    pub fn max_panels(mut self, v: Option<usize>) -> Self {
        self.cfg.max_panels = v;
        self
    }
    pub fn background(mut self, v: [u8; 3]) -> Self {
        self.cfg.background = v;
        self
    }
    pub fn outlines(mut self, v: bool) -> Self {
        self.cfg.panel_outlines = v;
        self
    }
    pub fn parallel(mut self, v: bool) -> Self {
        self.cfg.parallel = v;
        self
    }
    pub fn build(self) -> PageConfig {
        self.cfg
    }
}

impl PageConfig {
    /// Create a fluent builder for `PageConfig`.
    pub fn builder() -> PageConfigBuilder {
        PageConfigBuilder::new()
    }
}
