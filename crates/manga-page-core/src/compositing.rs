use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};
use tracing::{instrument, warn};

use crate::error::{GeometrySite, MangaError, Result};
use crate::model::Rect;

/// Page-level compositing options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComposeOptions {
    /// Canvas fill color.
    pub background: Rgb<u8>,
    /// If set, draw a 1px outline of this color around every panel (debug).
    pub outline: Option<Rgb<u8>>,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            background: Rgb([255, 255, 255]),
            outline: None,
        }
    }
}

/// Resizes `image` to cover `w x h` with Lanczos3 and center-crops the
/// excess, so the result is exactly `w x h` without distortion.
///
/// An empty source or target has nothing to scale and fails with
/// `MangaError::InvalidInput`.
pub fn fit_to_panel(image: &DynamicImage, w: u32, h: u32) -> Result<RgbImage> {
    if image.width() == 0 || image.height() == 0 {
        return Err(MangaError::InvalidInput(format!(
            "cannot fit an empty {}x{} image",
            image.width(),
            image.height()
        )));
    }
    if w == 0 || h == 0 {
        return Err(MangaError::InvalidInput(format!(
            "cannot fit into an empty {w}x{h} panel"
        )));
    }
    Ok(DynamicImage::ImageRgb8(image.to_rgb8())
        .resize_to_fill(w, h, FilterType::Lanczos3)
        .into_rgb8())
}

/// Copy `src` into `canvas` with its top-left at (dx, dy), clipping anything
/// that falls outside the canvas, then optionally outline the copied area.
pub fn blit_rgb(src: &RgbImage, canvas: &mut RgbImage, dx: u32, dy: u32, outline: Option<Rgb<u8>>) {
    let (cw, ch) = canvas.dimensions();
    let (sw, sh) = src.dimensions();

    for yy in 0..sh {
        if dy + yy >= ch {
            break;
        }
        for xx in 0..sw {
            if dx + xx >= cw {
                break;
            }
            canvas.put_pixel(dx + xx, dy + yy, *src.get_pixel(xx, yy));
        }
    }

    if let Some(color) = outline {
        for xx in 0..sw {
            if dx + xx < cw && dy < ch {
                canvas.put_pixel(dx + xx, dy, color);
            }
            let by = dy + sh.saturating_sub(1);
            if dx + xx < cw && by < ch {
                canvas.put_pixel(dx + xx, by, color);
            }
        }
        for yy in 0..sh {
            if dx < cw && dy + yy < ch {
                canvas.put_pixel(dx, dy + yy, color);
            }
            let rx = dx + sw.saturating_sub(1);
            if rx < cw && dy + yy < ch {
                canvas.put_pixel(rx, dy + yy, color);
            }
        }
    }
}

/// Places `images[i]` into `panels[i]` on a fresh `width x height` canvas
/// filled with `background`.
///
/// Fails with `MangaError::CountMismatch` when the lists differ in length,
/// with `MangaError::DegenerateGeometry` for any empty panel and with
/// `MangaError::InvalidInput` for any empty source image. Inputs are not
/// modified.
pub fn compose(
    images: &[DynamicImage],
    panels: &[Rect],
    width: u32,
    height: u32,
    background: Rgb<u8>,
) -> Result<RgbImage> {
    compose_with(
        images,
        panels,
        width,
        height,
        &ComposeOptions {
            background,
            outline: None,
        },
    )
}

#[instrument(skip_all, fields(panels = panels.len(), width = width, height = height))]
/// `compose` with explicit options.
pub fn compose_with(
    images: &[DynamicImage],
    panels: &[Rect],
    width: u32,
    height: u32,
    opts: &ComposeOptions,
) -> Result<RgbImage> {
    if images.len() != panels.len() {
        return Err(MangaError::CountMismatch {
            images: images.len(),
            panels: panels.len(),
        });
    }
    if let Some((index, rect)) = panels.iter().enumerate().find(|(_, r)| r.is_degenerate()) {
        return Err(MangaError::DegenerateGeometry {
            site: GeometrySite::Panel(index),
            rect: *rect,
        });
    }
    if let Some((index, img)) = images
        .iter()
        .enumerate()
        .find(|(_, img)| img.width() == 0 || img.height() == 0)
    {
        return Err(MangaError::InvalidInput(format!(
            "image {index} is empty ({}x{})",
            img.width(),
            img.height()
        )));
    }

    let page = Rect::new(0, 0, width, height);
    let mut canvas = RgbImage::from_pixel(width, height, opts.background);
    for (index, (image, panel)) in images.iter().zip(panels).enumerate() {
        if !page.contains(panel) {
            warn!(index, ?panel, "panel extends past the page; clipping");
        }
        let fitted = fit_to_panel(image, panel.w, panel.h)?;
        blit_rgb(&fitted, &mut canvas, panel.x, panel.y, opts.outline);
    }
    Ok(canvas)
}
