//! Output types for React frontend consumption.
//!
//! These structs are serialized to JSON and handed to the canvas, which
//! owns all drawing. Colours and labels are derived here from node state.

use serde::Serialize;

use crate::config::Palette;
use crate::graph::{Edge, Node, NodeKind, PointF, Snapshot};
use crate::history::History;
use crate::validate::Rejection;

/// A node ready for the canvas to display
#[derive(Debug, Clone, Serialize)]
pub struct NodeOutput {
    pub id: String,
    pub kind: NodeKind,
    pub label: String,
    pub color: String,
    pub branch: Option<String>,
    pub level: u32,
    pub position: PointF,
    /// Whether this node currently ends its branch
    pub terminal: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl NodeOutput {
    pub fn from_node(node: &Node, palette: &Palette) -> Self {
        let color = if node.is_join() {
            &palette.join
        } else if node.terminal {
            &palette.terminal
        } else {
            &palette.regular
        };

        Self {
            id: node.id.to_string(),
            kind: node.kind,
            label: node.label(),
            color: color.clone(),
            branch: node.branch.as_ref().map(ToString::to_string),
            level: node.level,
            position: node.position,
            terminal: node.terminal,
            image_url: node.image_url.clone(),
        }
    }
}

/// A directed edge between two nodes
#[derive(Debug, Clone, Serialize)]
pub struct EdgeOutput {
    pub id: String,
    pub source: String,
    pub target: String,
}

impl From<&Edge> for EdgeOutput {
    fn from(edge: &Edge) -> Self {
        Self {
            id: edge.id.clone(),
            source: edge.source.to_string(),
            target: edge.target.to_string(),
        }
    }
}

/// Why the last request was not applied
#[derive(Debug, Clone, Serialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl From<&Rejection> for ErrorInfo {
    fn from(rejection: &Rejection) -> Self {
        Self {
            code: rejection.code().to_string(),
            message: rejection.to_string(),
        }
    }
}

/// The combined output sent to React
#[derive(Debug, Clone, Serialize)]
pub struct GraphOutput {
    pub nodes: Vec<NodeOutput>,
    pub edges: Vec<EdgeOutput>,
    pub can_undo: bool,
    pub can_redo: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl GraphOutput {
    pub fn new(snapshot: &Snapshot, history: &History, palette: &Palette) -> Self {
        Self {
            nodes: snapshot
                .nodes
                .iter()
                .map(|n| NodeOutput::from_node(n, palette))
                .collect(),
            edges: snapshot.edges.iter().map(EdgeOutput::from).collect(),
            can_undo: history.can_undo(),
            can_redo: history.can_redo(),
            error: None,
        }
    }

    pub fn with_error(mut self, error: ErrorInfo) -> Self {
        self.error = Some(error);
        self
    }
}

/// One row of the colour legend
#[derive(Debug, Clone, Serialize)]
pub struct LegendEntry {
    pub name: &'static str,
    pub color: String,
}

pub fn legend(palette: &Palette) -> Vec<LegendEntry> {
    vec![
        LegendEntry { name: "Regular", color: palette.regular.clone() },
        LegendEntry { name: "Join", color: palette.join.clone() },
        LegendEntry { name: "End", color: palette.terminal.clone() },
    ]
}
