//! Pixel filters behind the stylization pipelines.
//!
//! All filters take borrowed images and return new buffers; out-of-bounds
//! neighbours are clamped to the nearest edge pixel.

use image::{GrayImage, Luma, Rgb, RgbImage};

/// Contrast-limited adaptive histogram equalization.
///
/// The image is split into a `tiles_x x tiles_y` grid (fewer tiles when the
/// image is smaller than the grid). Each tile gets an equalization LUT whose
/// histogram is clipped at `clip_limit * tile_area / 256` with the excess
/// redistributed uniformly; pixels interpolate bilinearly between the four
/// nearest tile LUTs. `clip_limit <= 0` disables clipping.
pub fn clahe(gray: &GrayImage, tiles_x: u32, tiles_y: u32, clip_limit: f32) -> GrayImage {
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 {
        return gray.clone();
    }
    let tile_w = w.div_ceil(tiles_x.clamp(1, w));
    let tile_h = h.div_ceil(tiles_y.clamp(1, h));
    let nx = w.div_ceil(tile_w);
    let ny = h.div_ceil(tile_h);

    let mut luts: Vec<[u8; 256]> = Vec::with_capacity((nx * ny) as usize);
    for ty in 0..ny {
        for tx in 0..nx {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(w);
            let y1 = (y0 + tile_h).min(h);
            let mut hist = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[gray.get_pixel(x, y).0[0] as usize] += 1;
                }
            }
            let area = (x1 - x0) * (y1 - y0);
            if clip_limit > 0.0 {
                let clip = ((clip_limit * area as f32 / 256.0) as u32).max(1);
                clip_histogram(&mut hist, clip);
            }
            luts.push(equalization_lut(&hist, area));
        }
    }

    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        let (ty0, ty1, wy) = tile_coords(y, tile_h, ny);
        for x in 0..w {
            let (tx0, tx1, wx) = tile_coords(x, tile_w, nx);
            let v = gray.get_pixel(x, y).0[0] as usize;
            let lut = |tx: u32, ty: u32| luts[(ty * nx + tx) as usize][v] as f32;
            let top = lut(tx0, ty0) * (1.0 - wx) + lut(tx1, ty0) * wx;
            let bot = lut(tx0, ty1) * (1.0 - wx) + lut(tx1, ty1) * wx;
            let val = top * (1.0 - wy) + bot * wy;
            out.put_pixel(x, y, Luma([val.round().clamp(0.0, 255.0) as u8]));
        }
    }
    out
}

fn clip_histogram(hist: &mut [u32; 256], clip: u32) {
    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > clip {
            excess += *bin - clip;
            *bin = clip;
        }
    }
    let batch = excess / 256;
    let mut residual = excess % 256;
    for bin in hist.iter_mut() {
        *bin += batch;
    }
    if residual > 0 {
        let step = (256 / residual).max(1) as usize;
        let mut i = 0;
        while i < 256 && residual > 0 {
            hist[i] += 1;
            residual -= 1;
            i += step;
        }
    }
}

fn equalization_lut(hist: &[u32; 256], area: u32) -> [u8; 256] {
    let mut lut = [0u8; 256];
    if area == 0 {
        return lut;
    }
    let scale = 255.0 / area as f32;
    let mut cdf = 0u32;
    for (i, count) in hist.iter().enumerate() {
        cdf += count;
        lut[i] = (cdf as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// Neighbouring tile indices along one axis and the weight of the second.
fn tile_coords(p: u32, tile: u32, n: u32) -> (u32, u32, f32) {
    let f = (p as f32 + 0.5) / tile as f32 - 0.5;
    let base = f.floor();
    let weight = f - base;
    let last = n as i64 - 1;
    let i0 = (base as i64).clamp(0, last) as u32;
    let i1 = (base as i64 + 1).clamp(0, last) as u32;
    (i0, i1, weight)
}

/// Summed-area table of `(w+1) x (h+1)` with a zero top row and left column.
fn integral_image(gray: &GrayImage) -> Vec<u64> {
    let (w, h) = gray.dimensions();
    let stride = (w + 1) as usize;
    let mut table = vec![0u64; stride * (h + 1) as usize];
    for y in 0..h {
        let mut row_sum = 0u64;
        for x in 0..w {
            row_sum += gray.get_pixel(x, y).0[0] as u64;
            let idx = (y + 1) as usize * stride + (x + 1) as usize;
            let above = y as usize * stride + (x + 1) as usize;
            table[idx] = row_sum + table[above];
        }
    }
    table
}

/// Binary threshold against the local mean.
///
/// For each pixel the mean of the `block_size x block_size` neighbourhood
/// (clipped to the image) is rounded, `c` is subtracted, and the pixel becomes
/// 255 when strictly above that value, 0 otherwise.
pub fn adaptive_mean_threshold(gray: &GrayImage, block_size: u32, c: i32) -> GrayImage {
    let (w, h) = gray.dimensions();
    let radius = block_size / 2;
    let integral = integral_image(gray);
    let stride = (w + 1) as usize;
    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        let y1 = y.saturating_sub(radius) as usize;
        let y2 = (y + radius + 1).min(h) as usize;
        for x in 0..w {
            let x1 = x.saturating_sub(radius) as usize;
            let x2 = (x + radius + 1).min(w) as usize;
            let area = ((x2 - x1) * (y2 - y1)) as f64;
            let sum = integral[y2 * stride + x2] + integral[y1 * stride + x1]
                - integral[y1 * stride + x2]
                - integral[y2 * stride + x1];
            let mean = (sum as f64 / area).round() as i32;
            let v = gray.get_pixel(x, y).0[0] as i32;
            let bin = if v > mean - c { 255u8 } else { 0u8 };
            out.put_pixel(x, y, Luma([bin]));
        }
    }
    out
}

/// Edge-preserving bilateral smoothing over a disc of the given `diameter`.
///
/// Spatial weight is `exp(-r² / 2σs²)`; range weight is `exp(-d² / 2σc²)` with
/// `d` the sum of absolute channel differences to the centre pixel.
pub fn bilateral(img: &RgbImage, diameter: u32, sigma_color: f32, sigma_space: f32) -> RgbImage {
    let (w, h) = img.dimensions();
    let radius = (diameter / 2).max(1) as i32;
    let space_coeff = -0.5 / (sigma_space * sigma_space);
    let color_coeff = -0.5 / (sigma_color * sigma_color);

    let mut taps: Vec<(i32, i32, f32)> = Vec::new();
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let r2 = (dx * dx + dy * dy) as f32;
            if r2 <= (radius * radius) as f32 {
                taps.push((dx, dy, (r2 * space_coeff).exp()));
            }
        }
    }
    let color_weight: Vec<f32> = (0..=255 * 3)
        .map(|d| ((d * d) as f32 * color_coeff).exp())
        .collect();

    let mut out = RgbImage::new(w, h);
    let max_x = w as i32 - 1;
    let max_y = h as i32 - 1;
    for y in 0..h as i32 {
        for x in 0..w as i32 {
            let center = img.get_pixel(x as u32, y as u32).0;
            let mut acc = [0f32; 3];
            let mut wsum = 0f32;
            for &(dx, dy, sw) in &taps {
                let nx = (x + dx).clamp(0, max_x) as u32;
                let ny = (y + dy).clamp(0, max_y) as u32;
                let p = img.get_pixel(nx, ny).0;
                let d = (p[0] as i32 - center[0] as i32).unsigned_abs()
                    + (p[1] as i32 - center[1] as i32).unsigned_abs()
                    + (p[2] as i32 - center[2] as i32).unsigned_abs();
                let wgt = sw * color_weight[d as usize];
                acc[0] += p[0] as f32 * wgt;
                acc[1] += p[1] as f32 * wgt;
                acc[2] += p[2] as f32 * wgt;
                wsum += wgt;
            }
            // the centre tap always has weight 1, so wsum > 0
            let px = [
                (acc[0] / wsum).round().clamp(0.0, 255.0) as u8,
                (acc[1] / wsum).round().clamp(0.0, 255.0) as u8,
                (acc[2] / wsum).round().clamp(0.0, 255.0) as u8,
            ];
            out.put_pixel(x as u32, y as u32, Rgb(px));
        }
    }
    out
}

/// Domain-transform recursive edge-preserving filter (Gastal & Oliveira).
///
/// Works on `[0, 1]` floats. Each iteration runs a causal and an anti-causal
/// first-order recursive pass along rows, then along columns, with feedback
/// `a^(1 + σs/σr · |∇I|)` where `a = exp(-√2 / σH)` and σH shrinks per
/// iteration.
pub fn recursive_edge_preserve(
    img: &RgbImage,
    sigma_s: f32,
    sigma_r: f32,
    iterations: u32,
) -> RgbImage {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 || iterations == 0 {
        return img.clone();
    }
    let (wu, hu) = (w as usize, h as usize);
    let mut buf: Vec<f32> = img.as_raw().iter().map(|&v| v as f32 / 255.0).collect();
    let at = |x: usize, y: usize| (y * wu + x) * 3;

    // dh[y][x] is the domain distance between (x-1, y) and (x, y);
    // dv[y][x] between (x, y-1) and (x, y). Index 0 on each axis is unused.
    let ratio = sigma_s / sigma_r;
    let mut dh = vec![0f32; wu * hu];
    let mut dv = vec![0f32; wu * hu];
    for y in 0..hu {
        for x in 0..wu {
            if x > 0 {
                let (a, b) = (at(x - 1, y), at(x, y));
                let d: f32 = (0..3).map(|c| (buf[b + c] - buf[a + c]).abs()).sum();
                dh[y * wu + x] = 1.0 + ratio * d;
            }
            if y > 0 {
                let (a, b) = (at(x, y - 1), at(x, y));
                let d: f32 = (0..3).map(|c| (buf[b + c] - buf[a + c]).abs()).sum();
                dv[y * wu + x] = 1.0 + ratio * d;
            }
        }
    }

    let n = iterations as i32;
    let denom = (4f32.powi(n) - 1.0).sqrt();
    for i in 0..n {
        let sigma_h = sigma_s * 3f32.sqrt() * 2f32.powi(n - (i + 1)) / denom;
        let a = (-(2f32.sqrt()) / sigma_h).exp();
        let vh: Vec<f32> = dh.iter().map(|&d| a.powf(d)).collect();
        let vv: Vec<f32> = dv.iter().map(|&d| a.powf(d)).collect();

        for y in 0..hu {
            for x in 1..wu {
                let k = vh[y * wu + x];
                let (p, q) = (at(x - 1, y), at(x, y));
                for c in 0..3 {
                    buf[q + c] += k * (buf[p + c] - buf[q + c]);
                }
            }
            for x in (0..wu - 1).rev() {
                let k = vh[y * wu + x + 1];
                let (p, q) = (at(x + 1, y), at(x, y));
                for c in 0..3 {
                    buf[q + c] += k * (buf[p + c] - buf[q + c]);
                }
            }
        }
        for x in 0..wu {
            for y in 1..hu {
                let k = vv[y * wu + x];
                let (p, q) = (at(x, y - 1), at(x, y));
                for c in 0..3 {
                    buf[q + c] += k * (buf[p + c] - buf[q + c]);
                }
            }
            for y in (0..hu - 1).rev() {
                let k = vv[(y + 1) * wu + x];
                let (p, q) = (at(x, y + 1), at(x, y));
                for c in 0..3 {
                    buf[q + c] += k * (buf[p + c] - buf[q + c]);
                }
            }
        }
    }

    let raw: Vec<u8> = buf
        .iter()
        .map(|v| (v * 255.0).round().clamp(0.0, 255.0) as u8)
        .collect();
    RgbImage::from_raw(w, h, raw).unwrap_or_else(|| img.clone())
}

/// Keeps `gray` where `mask` is non-zero, black elsewhere.
pub fn mask_gray(gray: &GrayImage, mask: &GrayImage) -> GrayImage {
    let (w, h) = gray.dimensions();
    GrayImage::from_fn(w, h, |x, y| {
        let v = gray.get_pixel(x, y).0[0];
        Luma([v & mask.get_pixel(x, y).0[0]])
    })
}

/// Per-channel AND of `img` with a single-channel `mask`.
pub fn mask_rgb(img: &RgbImage, mask: &GrayImage) -> RgbImage {
    let (w, h) = img.dimensions();
    RgbImage::from_fn(w, h, |x, y| {
        let p = img.get_pixel(x, y).0;
        let m = mask.get_pixel(x, y).0[0];
        Rgb([p[0] & m, p[1] & m, p[2] & m])
    })
}

/// Replicates a single channel into three.
pub fn gray_to_rgb(gray: &GrayImage) -> RgbImage {
    let (w, h) = gray.dimensions();
    RgbImage::from_fn(w, h, |x, y| {
        let v = gray.get_pixel(x, y).0[0];
        Rgb([v, v, v])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(w: u32, h: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |x, _| Luma([(x * 255 / w.max(2).saturating_sub(1)) as u8]))
    }

    #[test]
    fn adaptive_threshold_on_flat_image_is_white() {
        // v > mean - c holds for any c > 0 when v == mean
        let flat = GrayImage::from_pixel(20, 20, Luma([90]));
        let out = adaptive_mean_threshold(&flat, 9, 2);
        assert!(out.pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn adaptive_threshold_marks_dark_line() {
        let mut img = GrayImage::from_pixel(21, 21, Luma([200]));
        for y in 0..21 {
            img.put_pixel(10, y, Luma([20]));
        }
        let out = adaptive_mean_threshold(&img, 9, 9);
        assert_eq!(out.get_pixel(10, 10).0[0], 0);
        assert_eq!(out.get_pixel(2, 10).0[0], 255);
    }

    #[test]
    fn clahe_keeps_dimensions_and_flat_stays_flat() {
        // 32x16 gives equal-area tiles, so every tile LUT maps 77 identically
        let flat = GrayImage::from_pixel(32, 16, Luma([77]));
        let out = clahe(&flat, 8, 8, 2.0);
        assert_eq!(out.dimensions(), (32, 16));
        let first = out.get_pixel(0, 0).0[0];
        assert!(out.pixels().all(|p| p.0[0] == first));
    }

    #[test]
    fn clahe_handles_images_smaller_than_grid() {
        let img = gradient(3, 2);
        let out = clahe(&img, 8, 8, 2.0);
        assert_eq!(out.dimensions(), (3, 2));
    }

    #[test]
    fn clipped_histogram_preserves_mass() {
        let mut hist = [0u32; 256];
        hist[10] = 1000;
        hist[200] = 24;
        clip_histogram(&mut hist, 16);
        assert_eq!(hist.iter().sum::<u32>(), 1024);
        assert!(hist[10] <= 16 + 4);
    }

    #[test]
    fn bilateral_preserves_solid_color() {
        let img = RgbImage::from_pixel(12, 9, Rgb([10, 120, 250]));
        let out = bilateral(&img, 9, 75.0, 75.0);
        assert!(out.pixels().all(|p| p.0 == [10, 120, 250]));
    }

    #[test]
    fn recursive_filter_preserves_solid_color_and_size() {
        let img = RgbImage::from_pixel(15, 11, Rgb([40, 80, 160]));
        let out = recursive_edge_preserve(&img, 40.0, 0.3, 3);
        assert_eq!(out.dimensions(), (15, 11));
        assert!(out.pixels().all(|p| p.0 == [40, 80, 160]));
    }

    #[test]
    fn recursive_filter_keeps_strong_edge() {
        let img = RgbImage::from_fn(40, 10, |x, _| {
            if x < 20 { Rgb([0, 0, 0]) } else { Rgb([255, 255, 255]) }
        });
        let out = recursive_edge_preserve(&img, 40.0, 0.3, 3);
        assert!(out.get_pixel(5, 5).0[0] < 30);
        assert!(out.get_pixel(35, 5).0[0] > 225);
    }

    #[test]
    fn masks_zero_out_black_mask_pixels() {
        let gray = GrayImage::from_pixel(2, 1, Luma([180]));
        let mut mask = GrayImage::from_pixel(2, 1, Luma([255]));
        mask.put_pixel(1, 0, Luma([0]));
        let g = mask_gray(&gray, &mask);
        assert_eq!(g.get_pixel(0, 0).0[0], 180);
        assert_eq!(g.get_pixel(1, 0).0[0], 0);
        let rgb = mask_rgb(&gray_to_rgb(&gray), &mask);
        assert_eq!(rgb.get_pixel(0, 0).0, [180, 180, 180]);
        assert_eq!(rgb.get_pixel(1, 0).0, [0, 0, 0]);
    }
}
