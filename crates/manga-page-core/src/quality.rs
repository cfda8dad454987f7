use std::path::Path;

use image::{DynamicImage, GrayImage, Luma};
use imageproc::filter::laplacian_filter;
use tracing::{debug, instrument};

use crate::config::QualityConfig;
use crate::error::{MangaError, Result};
use crate::model::{QualityVerdict, VerdictKind};

/// BT.601 luminance (`0.299 R + 0.587 G + 0.114 B`) in 14-bit fixed point,
/// rounded. Gray sources pass through unchanged.
pub fn luminance(image: &DynamicImage) -> GrayImage {
    if let DynamicImage::ImageLuma8(gray) = image {
        return gray.clone();
    }
    let rgb = image.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        let luma = (r as u32 * 4899 + g as u32 * 9617 + b as u32 * 1868 + 8192) >> 14;
        Luma([luma as u8])
    })
}

/// Variance of the 3x3 Laplacian response over `gray`. Lower means blurrier.
pub fn sharpness_score(gray: &GrayImage) -> f64 {
    let lap = laplacian_filter(gray);
    let n = lap.width() as usize * lap.height() as usize;
    if n == 0 {
        return 0.0;
    }
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    for p in lap.pixels() {
        let v = p.0[0] as f64;
        sum += v;
        sum_sq += v * v;
    }
    let mean = sum / n as f64;
    (sum_sq / n as f64 - mean * mean).max(0.0)
}

/// Mean luminance of `gray` on a 0..=255 scale.
pub fn brightness_score(gray: &GrayImage) -> f64 {
    let n = gray.width() as usize * gray.height() as usize;
    if n == 0 {
        return 0.0;
    }
    let sum: u64 = gray.pixels().map(|p| p.0[0] as u64).sum();
    sum as f64 / n as f64
}

/// Screens one frame. Rejection is strict (`score < threshold`), so a score
/// exactly at its threshold passes. Darkness is checked before blur.
pub fn check(image: &DynamicImage, blur_threshold: f64, brightness_threshold: f64) -> QualityVerdict {
    let gray = luminance(image);
    let sharpness = sharpness_score(&gray);
    let brightness = brightness_score(&gray);
    debug!(sharpness, brightness, "quality scores");

    let (kind, reason) = if brightness < brightness_threshold {
        (
            VerdictKind::TooDark,
            format!("too dark (brightness: {brightness:.2} < {brightness_threshold})"),
        )
    } else if sharpness < blur_threshold {
        (
            VerdictKind::TooBlurry,
            format!("too blurry (score: {sharpness:.2} < {blur_threshold})"),
        )
    } else {
        (
            VerdictKind::Clear,
            format!("clear (blur score: {sharpness:.2}, brightness: {brightness:.2})"),
        )
    };
    QualityVerdict {
        is_usable: kind == VerdictKind::Clear,
        reason,
        kind,
        sharpness,
        brightness,
    }
}

/// Quality gate bound to a set of thresholds.
#[derive(Debug, Clone, Default)]
pub struct QualityGate {
    cfg: QualityConfig,
}

impl QualityGate {
    pub fn new(cfg: QualityConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &QualityConfig {
        &self.cfg
    }

    pub fn check(&self, image: &DynamicImage) -> QualityVerdict {
        check(image, self.cfg.blur_threshold, self.cfg.brightness_threshold)
    }

    /// Loads and screens an image file. A file that cannot be decoded is a
    /// `MangaError::Load`, never a rejection verdict.
    #[instrument(skip(self), fields(path = %path.as_ref().display()))]
    pub fn check_path(&self, path: impl AsRef<Path>) -> Result<QualityVerdict> {
        let image = load_image(path.as_ref())?;
        Ok(self.check(&image))
    }

    /// Decodes and screens an in-memory image.
    pub fn check_bytes(&self, data: &[u8]) -> Result<QualityVerdict> {
        let image = image::load_from_memory(data).map_err(MangaError::Decode)?;
        Ok(self.check(&image))
    }
}

/// Opens and decodes an image, mapping any failure to `MangaError::Load`.
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    let load = || -> std::result::Result<DynamicImage, image::ImageError> {
        image::ImageReader::open(path)?.with_guessed_format()?.decode()
    };
    load().map_err(|source| MangaError::Load {
        path: path.to_path_buf(),
        source,
    })
}
