//! Core library for turning video frames into a manga page.
//!
//! - Quality gate: Laplacian-variance sharpness and mean brightness screening
//! - Stylizers: line art (CLAHE + adaptive threshold), cel shading (bilateral + edges), edge-preserving comic filter
//! - Layout: seeded recursive binary partition of the page into panels in reading order
//! - Compositing: fit-and-crop each image into its panel on a single canvas
//! - Pipeline: `synthesize_page` runs all of the above over a batch of frames
//!
//! Quick example:
//! ```ignore
//! use image::Rgb;
//! use manga_page_core::{compose, generate_layout, stylize, Style};
//! # fn main() -> anyhow::Result<()> {
//! let frames = vec![image::open("f1.png")?, image::open("f2.png")?];
//! let styled: Vec<_> = frames
//!     .iter()
//!     .map(|f| image::DynamicImage::ImageRgb8(stylize(Style::CelShade, f)))
//!     .collect();
//! let panels = generate_layout(1000, 1400, styled.len(), Some(42), 0.1, 10, 0.3)?;
//! let page = compose(&styled, &panels, 1000, 1400, Rgb([255, 255, 255]))?;
//! page.save("page.png")?;
//! # Ok(()) }
//! ```

pub mod compositing;
pub mod config;
pub mod error;
pub mod export;
pub mod layout;
pub mod model;
pub mod pipeline;
pub mod quality;
pub mod stylize;

pub use compositing::*;
pub use config::*;
pub use error::*;
pub use export::*;
pub use layout::*;
pub use model::*;
pub use pipeline::*;
pub use quality::*;
pub use stylize::{stylize, stylize_path};

/// Convenience prelude for common types and functions.
/// Importing `manga_page_core::prelude::*` brings the primary APIs into scope.
pub mod prelude {
    pub use crate::compositing::{ComposeOptions, compose, compose_with, fit_to_panel};
    pub use crate::config::{
        LayoutConfig, PageConfig, PageConfigBuilder, QualityConfig, Style, parse_color,
    };
    pub use crate::error::{GeometrySite, MangaError, Result};
    pub use crate::layout::{
        SplitDirection, SplitNode, SplitTree, build_split_tree, generate_layout,
        generate_layout_with,
    };
    pub use crate::model::{PageStats, QualityVerdict, Rect, VerdictKind};
    pub use crate::pipeline::{
        FrameOutcome, FrameReport, InputFrame, PageOutput, synthesize_page,
        synthesize_page_from_paths,
    };
    pub use crate::quality::{QualityGate, check};
    pub use crate::stylize::{stylize, stylize_path};
}
