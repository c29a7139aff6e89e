// Equispaced level layout.
//
// Rows are levels (ascending), each row centred in the container:
// - y = (level - 1) * vertical_spacing + top_margin
// - x = start + i * horizontal_spacing, start centres the row
// Node order within a row follows the node list.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::graph::{Node, PointF};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Distance between consecutive levels.
    pub vertical_spacing: f64,
    /// Distance between neighbours on the same level.
    pub horizontal_spacing: f64,
    /// Offset of the first level from the top.
    pub top_margin: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            vertical_spacing: 250.0,
            horizontal_spacing: 500.0,
            top_margin: 100.0,
        }
    }
}

/// Positions for every node; nothing but `position` changes.
pub fn equispaced(nodes: &[Node], container_width: f64, cfg: &LayoutConfig) -> Vec<Node> {
    let mut rows: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    for (i, node) in nodes.iter().enumerate() {
        rows.entry(node.level).or_default().push(i);
    }

    let mut out = nodes.to_vec();
    for (level, members) in rows {
        let total_w = (members.len().saturating_sub(1)) as f64 * cfg.horizontal_spacing;
        let start_x = (container_width - total_w) / 2.0;
        let y = f64::from(level.saturating_sub(1)) * cfg.vertical_spacing + cfg.top_margin;

        for (col, &i) in members.iter().enumerate() {
            out[i].position = PointF {
                x: start_x + col as f64 * cfg.horizontal_spacing,
                y,
            };
        }
    }
    out
}
