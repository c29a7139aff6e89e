use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lineage::BranchPath;

/// Marker appended to the label of the node that currently ends a branch.
pub const TERMINAL_MARKER: &str = "Parallel End";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid node id: {0:?} (expected node_<n>)")]
    NodeId(String),
    #[error("unknown node kind: {0:?}")]
    NodeKind(String),
}

// ============================================================================
// Identifiers
// ============================================================================

/// Stable node identifier. Allocated once per session, never reused.
/// Renders as `node_<n>`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node_{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix("node_")
            .filter(|n| is_canonical_number(n))
            .and_then(|n| n.parse().ok())
            .map(NodeId)
            .ok_or_else(|| ParseError::NodeId(s.to_string()))
    }
}

/// Digits only, no sign, no leading zero: exactly what `Display` writes.
fn is_canonical_number(n: &str) -> bool {
    !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()) && (n == "0" || !n.starts_with('0'))
}

// ============================================================================
// Node kinds
// ============================================================================

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Regular,
    /// The only kind that may fan out to several branches or take several
    /// incoming branches.
    Join,
    ImageVariant,
    IconVariant,
}

impl NodeKind {
    pub fn is_join(self) -> bool {
        matches!(self, NodeKind::Join)
    }

    /// Human name used in default node titles ("Join Node 3").
    pub fn display_name(self) -> &'static str {
        match self {
            NodeKind::Regular => "Regular",
            NodeKind::Join => "Join",
            NodeKind::ImageVariant => "Image",
            NodeKind::IconVariant => "Icon",
        }
    }
}

impl FromStr for NodeKind {
    type Err = ParseError;

    /// Accepts both the engine names and the names the canvas uses for its
    /// node components.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "regular" | "default" => Ok(NodeKind::Regular),
            "join" | "circular" => Ok(NodeKind::Join),
            "image" | "imageNode" | "image_variant" => Ok(NodeKind::ImageVariant),
            "icon" | "iconNode" | "icon_variant" => Ok(NodeKind::IconVariant),
            other => Err(ParseError::NodeKind(other.to_string())),
        }
    }
}

// ============================================================================
// Nodes and edges
// ============================================================================

#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PointF {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Base display text, e.g. "Regular Node 2". Branch annotations are
    /// derived on top of it by [`Node::label`].
    pub title: String,
    /// None until the node is first touched by a connection.
    pub branch: Option<BranchPath>,
    /// Depth used for layout only.
    pub level: u32,
    pub position: PointF,
    /// Whether this node is currently the open end of its branch.
    pub terminal: bool,
    pub image_url: Option<String>,
}

impl Node {
    pub fn new(id: NodeId, kind: NodeKind, position: PointF) -> Self {
        Self {
            id,
            kind,
            title: format!("{} Node {}", kind.display_name(), id.0),
            branch: None,
            level: 1,
            position,
            terminal: false,
            image_url: None,
        }
    }

    pub fn is_join(&self) -> bool {
        self.kind.is_join()
    }

    /// The branch this node contributes to its successors: its own branch,
    /// or `b_<id>` if it has none yet.
    pub fn effective_branch(&self) -> BranchPath {
        self.branch
            .clone()
            .unwrap_or_else(|| BranchPath::synthesized(self.id))
    }

    /// Display label derived from title, branch and terminal status.
    pub fn label(&self) -> String {
        match (&self.branch, self.terminal) {
            (Some(branch), true) => format!("{} - {} {}", self.title, TERMINAL_MARKER, branch),
            (Some(branch), false) if self.is_join() => format!("{} - {}", self.title, branch),
            _ => self.title.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub id: String,
    pub source: NodeId,
    pub target: NodeId,
}

impl Edge {
    pub fn new(source: NodeId, target: NodeId) -> Self {
        Self {
            id: format!("e{}-{}", source, target),
            source,
            target,
        }
    }

    pub fn touches(&self, id: NodeId) -> bool {
        self.source == id || self.target == id
    }
}

/// One immutable (nodes, edges) pair. Every mutation builds a new one.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Snapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Snapshot {
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn out_degree(&self, id: NodeId) -> usize {
        self.edges.iter().filter(|e| e.source == id).count()
    }
}
