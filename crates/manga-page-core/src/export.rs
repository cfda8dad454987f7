use serde_json::{Value, json};

use crate::model::{PageStats, Rect};
use crate::pipeline::{FrameReport, PageOutput};

/// Serialize panel geometry as `{ page, panels, stats }`.
/// Panels keep reading order and carry their index for UI previews.
pub fn layout_to_json(panels: &[Rect], width: u32, height: u32) -> Value {
    let stats = PageStats::from_panels(panels, width, height);
    let panels_val: Vec<Value> = panels
        .iter()
        .enumerate()
        .map(|(i, r)| json!({"index": i, "x": r.x, "y": r.y, "w": r.w, "h": r.h}))
        .collect();
    json!({
        "page": {"w": width, "h": height},
        "panels": panels_val,
        "stats": stats,
    })
}

/// Per-frame verdicts as a JSON array.
pub fn reports_to_json(reports: &[FrameReport]) -> Value {
    json!(reports)
}

/// Full record of a pipeline run: layout plus which frame sits in which panel
/// and every frame's verdict.
pub fn page_output_to_json(out: &PageOutput) -> Value {
    let mut value = layout_to_json(&out.panels, out.page.width(), out.page.height());
    if let Some(panels) = value.get_mut("panels").and_then(Value::as_array_mut) {
        for (panel, key) in panels.iter_mut().zip(&out.placed) {
            panel["frame"] = json!(key);
        }
    }
    value["frames"] = reports_to_json(&out.reports);
    value
}
