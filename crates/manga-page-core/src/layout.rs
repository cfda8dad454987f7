//! Recursive binary space partition of a page into panels.
//!
//! The largest (and most elongated) leaf is split repeatedly until the
//! requested panel count is reached. Vertical splits put the first child on
//! the left, horizontal splits put it on top, so a first-child-first
//! depth-first walk of the tree yields reading order.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use tracing::{instrument, trace};

use crate::config::LayoutConfig;
use crate::error::{GeometrySite, MangaError, Result};
use crate::model::Rect;

/// Leaves at least this much wider than tall always split side by side.
const FORCE_VERTICAL_ASPECT: f64 = 1.25;
/// Leaves at most this wide relative to their height always split stacked.
const FORCE_HORIZONTAL_ASPECT: f64 = 0.8;

/// Orientation of the cut line.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SplitDirection {
    /// Cut along x: children sit left and right.
    Vertical,
    /// Cut along y: children sit top and bottom.
    Horizontal,
}

pub type NodeId = usize;

/// Node of the partition tree, stored in `SplitTree`'s arena.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum SplitNode {
    Leaf(Rect),
    Split {
        rect: Rect,
        direction: SplitDirection,
        ratio: f64,
        /// Left (vertical) or top (horizontal) child.
        left: NodeId,
        /// Right (vertical) or bottom (horizontal) child.
        right: NodeId,
    },
}

impl SplitNode {
    pub fn rect(&self) -> Rect {
        match self {
            SplitNode::Leaf(r) => *r,
            SplitNode::Split { rect, .. } => *rect,
        }
    }
}

/// Arena-backed partition tree. Node 0 is the root covering the whole page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SplitTree {
    nodes: Vec<SplitNode>,
}

impl SplitTree {
    fn new(root: Rect) -> Self {
        Self {
            nodes: vec![SplitNode::Leaf(root)],
        }
    }

    pub fn root(&self) -> NodeId {
        0
    }

    pub fn node(&self, id: NodeId) -> &SplitNode {
        &self.nodes[id]
    }

    pub fn nodes(&self) -> &[SplitNode] {
        &self.nodes
    }

    /// Leaf rectangles in reading order (depth-first, first child first).
    pub fn leaves(&self) -> Vec<Rect> {
        let mut out = Vec::new();
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            match &self.nodes[id] {
                SplitNode::Leaf(r) => out.push(*r),
                SplitNode::Split { left, right, .. } => {
                    stack.push(*right);
                    stack.push(*left);
                }
            }
        }
        out
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, SplitNode::Leaf(_)))
            .count()
    }

    /// Replaces leaf `id` with a split and returns the two new child ids.
    fn split(
        &mut self,
        id: NodeId,
        direction: SplitDirection,
        ratio: f64,
    ) -> Result<(NodeId, NodeId)> {
        let rect = self.nodes[id].rect();
        let (a, b) = partition(&rect, direction, ratio);
        let left = self.nodes.len();
        let right = left + 1;
        for child in [a, b] {
            if child.is_degenerate() {
                return Err(MangaError::DegenerateGeometry {
                    site: GeometrySite::Node(id),
                    rect: child,
                });
            }
        }
        self.nodes.push(SplitNode::Leaf(a));
        self.nodes.push(SplitNode::Leaf(b));
        self.nodes[id] = SplitNode::Split {
            rect,
            direction,
            ratio,
            left,
            right,
        };
        Ok((left, right))
    }
}

/// Splits `r` at `ratio` along `direction`. The first child gets the floor of
/// the scaled dimension, the second the remainder, so the two tile `r` exactly.
fn partition(r: &Rect, direction: SplitDirection, ratio: f64) -> (Rect, Rect) {
    match direction {
        SplitDirection::Vertical => {
            let w1 = (r.w as f64 * ratio) as u32;
            let w2 = r.w - w1.min(r.w);
            (
                Rect::new(r.x, r.y, w1, r.h),
                Rect::new(r.x + w1, r.y, w2, r.h),
            )
        }
        SplitDirection::Horizontal => {
            let h1 = (r.h as f64 * ratio) as u32;
            let h2 = r.h - h1.min(r.h);
            (
                Rect::new(r.x, r.y, r.w, h1),
                Rect::new(r.x, r.y + h1, r.w, h2),
            )
        }
    }
}

/// Split priority: area, boosted for elongated leaves.
fn leaf_score(r: &Rect) -> f64 {
    let w = r.w as f64;
    let h = r.h as f64;
    let aspect = (w / h).max(h / w);
    w * h * aspect.powf(1.5)
}

fn choose_direction<R: Rng + ?Sized>(rng: &mut R, r: &Rect) -> SplitDirection {
    let aspect = r.aspect();
    if aspect >= FORCE_VERTICAL_ASPECT {
        SplitDirection::Vertical
    } else if aspect <= FORCE_HORIZONTAL_ASPECT {
        SplitDirection::Horizontal
    } else if rng.gen_bool(0.5) {
        SplitDirection::Vertical
    } else {
        SplitDirection::Horizontal
    }
}

fn validate_params(
    width: u32,
    height: u32,
    split_std_dev: f64,
    min_split_ratio: f64,
) -> Result<()> {
    LayoutConfig {
        page_width: width,
        page_height: height,
        split_std_dev,
        min_split_ratio,
        ..Default::default()
    }
    .validate()
}

/// Builds the partition tree with an explicit random source.
///
/// `panel_count <= 1` yields a tree holding only the root. Every random draw
/// (direction inside the hysteresis band, split ratio) comes from `rng`, so a
/// seeded generator reproduces the same tree.
pub fn build_split_tree<R: Rng + ?Sized>(
    rng: &mut R,
    width: u32,
    height: u32,
    panel_count: usize,
    split_std_dev: f64,
    min_split_ratio: f64,
) -> Result<SplitTree> {
    validate_params(width, height, split_std_dev, min_split_ratio)?;
    let normal = Normal::new(0.5, split_std_dev)
        .map_err(|e| MangaError::InvalidConfig(format!("split_std_dev: {e}")))?;

    let mut tree = SplitTree::new(Rect::new(0, 0, width, height));
    let mut leaves: Vec<NodeId> = vec![tree.root()];

    while leaves.len() < panel_count {
        // strict `>` keeps the first of equally scored leaves
        let mut best = 0usize;
        let mut best_score = f64::MIN;
        for (i, &id) in leaves.iter().enumerate() {
            let s = leaf_score(&tree.node(id).rect());
            if s > best_score {
                best_score = s;
                best = i;
            }
        }
        let id = leaves.remove(best);
        let rect = tree.node(id).rect();
        let direction = choose_direction(rng, &rect);
        let ratio = normal
            .sample(rng)
            .clamp(min_split_ratio, 1.0 - min_split_ratio);
        trace!(?rect, ?direction, ratio, "split leaf");
        let (left, right) = tree.split(id, direction, ratio)?;
        leaves.push(left);
        leaves.push(right);
    }
    Ok(tree)
}

/// Shrinks each rectangle by `margin` on all sides. Rectangles with
/// `w <= 2*margin` or `h <= 2*margin` are kept unmargined.
pub fn apply_margin(rects: &[Rect], margin: u32) -> Vec<Rect> {
    rects.iter().map(|r| r.inset(margin)).collect()
}

#[instrument(skip(split_std_dev, margin, min_split_ratio))]
/// Generates `panel_count` panel rectangles for a `width x height` page in
/// reading order (top-to-bottom, left-to-right at each split).
///
/// Notes:
/// - `seed: Some(_)` makes the result reproducible; `None` seeds from entropy.
/// - The split ratio is drawn from `N(0.5, split_std_dev)` and clamped to
///   `[min_split_ratio, 1 - min_split_ratio]`.
/// - A split that would produce an empty rectangle fails with
///   `MangaError::DegenerateGeometry`.
pub fn generate_layout(
    width: u32,
    height: u32,
    panel_count: usize,
    seed: Option<u64>,
    split_std_dev: f64,
    margin: u32,
    min_split_ratio: f64,
) -> Result<Vec<Rect>> {
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    let tree = build_split_tree(
        &mut rng,
        width,
        height,
        panel_count,
        split_std_dev,
        min_split_ratio,
    )?;
    Ok(apply_margin(&tree.leaves(), margin))
}

/// `generate_layout` driven by a `LayoutConfig`.
pub fn generate_layout_with(cfg: &LayoutConfig) -> Result<Vec<Rect>> {
    cfg.validate()?;
    generate_layout(
        cfg.page_width,
        cfg.page_height,
        cfg.panel_count,
        cfg.seed,
        cfg.split_std_dev,
        cfg.margin,
        cfg.min_split_ratio,
    )
}
