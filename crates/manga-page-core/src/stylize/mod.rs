use std::path::Path;

use image::{DynamicImage, RgbImage};
use imageproc::filter::median_filter;
use tracing::{instrument, warn};

use crate::config::Style;
use crate::error::Result;
use crate::quality::{load_image, luminance};

pub mod filters;

use filters::{
    adaptive_mean_threshold, bilateral, clahe, gray_to_rgb, mask_gray, mask_rgb,
    recursive_edge_preserve,
};

/// Converts `image` with the chosen pipeline. Never mutates the input.
pub fn stylize(style: Style, image: &DynamicImage) -> RgbImage {
    match style {
        Style::LineArt => line_art(image),
        Style::CelShade => cel_shade(image),
        Style::EdgePreserve => edge_preserve(image),
    }
}

/// Pipeline A: black line art over contrast-enhanced grayscale.
pub fn line_art(image: &DynamicImage) -> RgbImage {
    let gray = luminance(image);
    let enhanced = clahe(&gray, 8, 8, 2.0);
    let lines = adaptive_mean_threshold(&enhanced, 9, 9);
    gray_to_rgb(&mask_gray(&enhanced, &lines))
}

/// Pipeline B: flattened color regions with black edges.
pub fn cel_shade(image: &DynamicImage) -> RgbImage {
    let mut color = image.to_rgb8();
    for _ in 0..3 {
        color = bilateral(&color, 9, 75.0, 75.0);
    }
    let gray = luminance(image);
    let denoised = median_filter(&gray, 3, 3);
    let edges = adaptive_mean_threshold(&denoised, 9, 2);
    mask_rgb(&color, &edges)
}

/// Pipeline C: single recursive edge-preserving pass. A cheap comic look,
/// not a learned style transfer.
pub fn edge_preserve(image: &DynamicImage) -> RgbImage {
    recursive_edge_preserve(&image.to_rgb8(), 40.0, 0.3, 3)
}

/// Loads `path`, stylizes it and, if `output` is given, saves the result there.
///
/// A file that cannot be decoded fails with `MangaError::Load`. Saving is
/// best-effort: a write failure is logged and the stylized image is still returned.
#[instrument(skip_all, fields(path = %path.as_ref().display(), style = style.name()))]
pub fn stylize_path(
    style: Style,
    path: impl AsRef<Path>,
    output: Option<&Path>,
) -> Result<RgbImage> {
    let image = load_image(path.as_ref())?;
    let result = stylize(style, &image);
    if let Some(out) = output {
        save_best_effort(&result, out);
    }
    Ok(result)
}

pub(crate) fn save_best_effort(img: &RgbImage, out: &Path) {
    if let Err(e) = img.save(out) {
        warn!(path = %out.display(), error = %e, "failed to save stylized image");
    }
}
