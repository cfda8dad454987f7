use std::path::{Path, PathBuf};

use image::{DynamicImage, Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::compositing::{ComposeOptions, compose_with};
use crate::config::{PageConfig, Style};
use crate::error::{MangaError, Result};
use crate::layout::generate_layout_with;
use crate::model::{PageStats, QualityVerdict, Rect};
use crate::quality::{QualityGate, load_image};
use crate::stylize::stylize;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// In-memory frame to place (key + decoded image).
pub struct InputFrame {
    pub key: String,
    pub image: DynamicImage,
}

/// What happened to one input frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FrameOutcome {
    Accepted(QualityVerdict),
    Rejected(QualityVerdict),
    /// The frame could not be loaded; the rest of the batch is unaffected.
    Failed { error: String },
}

/// Per-frame record of a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FrameReport {
    pub key: String,
    pub outcome: FrameOutcome,
    /// True if the frame was stylized and placed on the page.
    pub placed: bool,
}

/// Finished page plus the geometry and per-frame records that produced it.
pub struct PageOutput {
    pub page: RgbImage,
    /// Panels in reading order; `panels[i]` holds `placed[i]`.
    pub panels: Vec<Rect>,
    pub placed: Vec<String>,
    pub reports: Vec<FrameReport>,
}

impl PageOutput {
    pub fn stats(&self) -> PageStats {
        PageStats::from_panels(&self.panels, self.page.width(), self.page.height())
    }
}

/// Loads every path. Failures become `FrameOutcome::Failed` reports instead
/// of aborting the batch.
pub fn load_frames(paths: &[PathBuf]) -> (Vec<InputFrame>, Vec<FrameReport>) {
    load_frames_with(paths, |_| {})
}

/// `load_frames` calling `on_item` with each path once it has been tried
/// (progress reporting).
pub fn load_frames_with<F: FnMut(&Path)>(
    paths: &[PathBuf],
    mut on_item: F,
) -> (Vec<InputFrame>, Vec<FrameReport>) {
    let mut frames = Vec::with_capacity(paths.len());
    let mut failed = Vec::new();
    for p in paths {
        let key = p.to_string_lossy().replace('\\', "/");
        match load_image(p) {
            Ok(image) => frames.push(InputFrame { key, image }),
            Err(e) => {
                warn!(path = %p.display(), error = %e, "skip frame");
                failed.push(FrameReport {
                    key,
                    outcome: FrameOutcome::Failed {
                        error: e.to_string(),
                    },
                    placed: false,
                });
            }
        }
        on_item(p);
    }
    (frames, failed)
}

/// Picks `max` indices out of `0..n` spread evenly and in increasing order.
/// Returns all of them when `max` is `None` or at least `n`.
pub fn select_evenly(n: usize, max: Option<usize>) -> Vec<usize> {
    match max {
        Some(m) if m < n => (0..m).map(|i| i * n / m).collect(),
        _ => (0..n).collect(),
    }
}

fn screen(frames: &[InputFrame], gate: &QualityGate, parallel: bool) -> Vec<QualityVerdict> {
    #[cfg(feature = "parallel")]
    {
        if parallel {
            return frames.par_iter().map(|f| gate.check(&f.image)).collect();
        }
    }
    let _ = parallel;
    frames.iter().map(|f| gate.check(&f.image)).collect()
}

fn stylize_all(images: Vec<&DynamicImage>, style: Style, parallel: bool) -> Vec<DynamicImage> {
    #[cfg(feature = "parallel")]
    {
        if parallel {
            return images
                .into_par_iter()
                .map(|img| DynamicImage::ImageRgb8(stylize(style, img)))
                .collect();
        }
    }
    let _ = parallel;
    images
        .into_iter()
        .map(|img| DynamicImage::ImageRgb8(stylize(style, img)))
        .collect()
}

#[instrument(skip_all, fields(frames = frames.len()))]
/// Screens, stylizes, lays out and composes `frames` into one page.
///
/// Notes:
/// - Rejected frames are reported, never placed; if none pass the result is
///   `MangaError::Empty` carrying every frame's report.
/// - `max_panels` samples accepted frames evenly, keeping their order.
/// - The layout gets exactly one panel per placed frame.
pub fn synthesize_page(frames: Vec<InputFrame>, cfg: &PageConfig) -> Result<PageOutput> {
    cfg.validate()?;
    let gate = QualityGate::new(cfg.quality.clone());
    let verdicts = screen(&frames, &gate, cfg.parallel);

    let accepted: Vec<usize> = verdicts
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_usable)
        .map(|(i, _)| i)
        .collect();
    info!(
        total = frames.len(),
        accepted = accepted.len(),
        "screened frames"
    );
    if accepted.is_empty() {
        let reports = frames
            .into_iter()
            .zip(verdicts)
            .map(|(f, v)| FrameReport {
                key: f.key,
                outcome: FrameOutcome::Rejected(v),
                placed: false,
            })
            .collect();
        return Err(MangaError::Empty { reports });
    }

    let chosen: Vec<usize> = select_evenly(accepted.len(), cfg.max_panels)
        .into_iter()
        .map(|i| accepted[i])
        .collect();
    let mut placed_mask = vec![false; frames.len()];
    for &i in &chosen {
        placed_mask[i] = true;
    }

    let sources: Vec<&DynamicImage> = chosen.iter().map(|&i| &frames[i].image).collect();
    let stylized = stylize_all(sources, cfg.style, cfg.parallel);
    debug!(count = stylized.len(), style = cfg.style.name(), "stylized frames");

    let mut layout = cfg.layout.clone();
    layout.panel_count = chosen.len();
    let panels = generate_layout_with(&layout)?;

    let opts = ComposeOptions {
        background: Rgb(cfg.background),
        outline: cfg.panel_outlines.then_some(Rgb([255, 0, 0])),
    };
    let page = compose_with(
        &stylized,
        &panels,
        layout.page_width,
        layout.page_height,
        &opts,
    )?;

    let placed: Vec<String> = chosen.iter().map(|&i| frames[i].key.clone()).collect();
    let reports = frames
        .into_iter()
        .zip(verdicts)
        .zip(placed_mask)
        .map(|((f, v), placed)| FrameReport {
            key: f.key,
            outcome: if v.is_usable {
                FrameOutcome::Accepted(v)
            } else {
                FrameOutcome::Rejected(v)
            },
            placed,
        })
        .collect();

    Ok(PageOutput {
        page,
        panels,
        placed,
        reports,
    })
}

/// Loads `paths` and runs `synthesize_page`. Frames that fail to load are
/// appended to the reports as `Failed`; they do not abort the page.
pub fn synthesize_page_from_paths(paths: &[PathBuf], cfg: &PageConfig) -> Result<PageOutput> {
    synthesize_page_from_paths_with(paths, cfg, |_| {})
}

/// `synthesize_page_from_paths` calling `on_load` after each path is read.
pub fn synthesize_page_from_paths_with<F: FnMut(&Path)>(
    paths: &[PathBuf],
    cfg: &PageConfig,
    on_load: F,
) -> Result<PageOutput> {
    let (frames, failed) = load_frames_with(paths, on_load);
    info!(count = frames.len(), failed = failed.len(), "loaded input frames");
    match synthesize_page(frames, cfg) {
        Ok(mut out) => {
            out.reports.extend(failed);
            Ok(out)
        }
        Err(MangaError::Empty { mut reports }) => {
            reports.extend(failed);
            Err(MangaError::Empty { reports })
        }
        Err(e) => Err(e),
    }
}
