use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::model::Rect;
use crate::pipeline::FrameReport;

/// Where a zero-sized rectangle was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometrySite {
    /// Position in the panel list handed to the compositor.
    Panel(usize),
    /// Layout tree node whose split produced the empty child.
    Node(usize),
}

impl fmt::Display for GeometrySite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometrySite::Panel(i) => write!(f, "panel {i}"),
            GeometrySite::Node(id) => write!(f, "split of layout node {id}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum MangaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Failed to load image {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Failed to decode image buffer: {0}")]
    Decode(#[source] image::ImageError),
    #[error("Number of images ({images}) must match number of panels ({panels})")]
    CountMismatch { images: usize, panels: usize },
    #[error("Degenerate geometry at {site}: {rect:?}")]
    DegenerateGeometry { site: GeometrySite, rect: Rect },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Unknown style: {0}")]
    UnknownStyle(String),
    /// Nothing passed the quality gate. `reports` says why for every frame.
    #[error("No usable frames to place on the page ({} screened)", reports.len())]
    Empty { reports: Vec<FrameReport> },
}

pub type Result<T> = std::result::Result<T, MangaError>;
