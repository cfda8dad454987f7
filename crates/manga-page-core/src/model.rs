use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle (pixels). `x,y` is top-left; `w,h` are sizes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
    /// Inclusive right edge coordinate (`x + w - 1`).
    pub fn right(&self) -> u32 {
        self.x + self.w.saturating_sub(1)
    }
    /// Inclusive bottom edge coordinate (`y + h - 1`).
    pub fn bottom(&self) -> u32 {
        self.y + self.h.saturating_sub(1)
    }
    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }
    pub fn is_degenerate(&self) -> bool {
        self.w == 0 || self.h == 0
    }
    /// Returns true if `r` is fully inside `self` (inclusive edges).
    pub fn contains(&self, r: &Rect) -> bool {
        r.x >= self.x && r.y >= self.y && r.right() <= self.right() && r.bottom() <= self.bottom()
    }
    /// Returns true if the two rectangles share at least one pixel.
    pub fn intersects(&self, r: &Rect) -> bool {
        !(self.x >= r.x + r.w || r.x >= self.x + self.w || self.y >= r.y + r.h || r.y >= self.y + self.h)
    }
    /// Width over height. Zero-height rectangles report `f64::INFINITY`.
    pub fn aspect(&self) -> f64 {
        if self.h == 0 {
            return f64::INFINITY;
        }
        self.w as f64 / self.h as f64
    }
    /// Shrinks every side by `margin`, or returns `self` unchanged when the
    /// rectangle cannot absorb the margin on both axes.
    pub fn inset(&self, margin: u32) -> Rect {
        let twice = margin.saturating_mul(2);
        if self.w > twice && self.h > twice {
            Rect::new(self.x + margin, self.y + margin, self.w - twice, self.h - twice)
        } else {
            *self
        }
    }
}

/// Classification produced by the quality gate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VerdictKind {
    Clear,
    TooBlurry,
    TooDark,
}

/// Result of screening one frame. `reason` is always populated, also on acceptance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QualityVerdict {
    pub is_usable: bool,
    pub reason: String,
    pub kind: VerdictKind,
    /// Variance of the Laplacian response over luminance.
    pub sharpness: f64,
    /// Mean luminance on a 0..=255 scale.
    pub brightness: f64,
}

/// Coverage statistics for a panel list on a page.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PageStats {
    pub num_panels: usize,
    /// `width * height` of the page.
    pub page_area: u64,
    /// Sum of panel areas.
    pub covered_area: u64,
    /// covered_area / page_area (0.0 to 1.0).
    pub coverage: f64,
}

impl PageStats {
    /// Computes coverage of `panels` on a `width x height` page.
    pub fn from_panels(panels: &[Rect], width: u32, height: u32) -> Self {
        let page_area = width as u64 * height as u64;
        let covered_area: u64 = panels.iter().map(Rect::area).sum();
        let coverage = if page_area > 0 {
            covered_area as f64 / page_area as f64
        } else {
            0.0
        };
        Self {
            num_panels: panels.len(),
            page_area,
            covered_area,
            coverage,
        }
    }

    /// Returns a human-readable summary of the statistics.
    pub fn summary(&self) -> String {
        format!(
            "Panels: {}, Coverage: {:.2}%, Page Area: {} px², Covered Area: {} px²",
            self.num_panels,
            self.coverage * 100.0,
            self.page_area,
            self.covered_area,
        )
    }

    /// Page pixels not covered by any panel (margins and gutters).
    pub fn uncovered_area(&self) -> u64 {
        self.page_area.saturating_sub(self.covered_area)
    }
}
