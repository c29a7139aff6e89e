//! Branch naming and convergence resolution for one accepted connection.

use crate::graph::{Edge, Node, NodeId};
use crate::lineage::{lca, BranchPath, LineageRegistry};

/// Branch carried across a new `source -> target` edge.
///
/// A join source opens a fresh child branch under its own path; any other
/// source continues the branch it is on.
pub fn outgoing_branch(source: &Node, lineage: &mut LineageRegistry) -> BranchPath {
    let base = source.effective_branch();
    if source.is_join() {
        lineage.next_child_branch(&base)
    } else {
        base
    }
}

/// Branches currently flowing into `target` through `edges`.
///
/// When `substitute` is set, the edge coming from that node contributes the
/// given branch instead of the node's stored one.
pub fn incoming_branches(
    target: NodeId,
    nodes: &[Node],
    edges: &[Edge],
    substitute: Option<(NodeId, &BranchPath)>,
) -> Vec<BranchPath> {
    edges
        .iter()
        .filter(|e| e.target == target)
        .map(|e| match substitute {
            Some((id, branch)) if id == e.source => branch.clone(),
            _ => nodes
                .iter()
                .find(|n| n.id == e.source)
                .map(Node::effective_branch)
                .unwrap_or_else(|| BranchPath::synthesized(e.source)),
        })
        .collect()
}

/// Resolve the branch a join takes from its incoming branches and count the
/// convergence. An empty common prefix becomes `root`.
pub fn resolve_convergence(
    incoming: &[BranchPath],
    lineage: &mut LineageRegistry,
    root: &BranchPath,
) -> BranchPath {
    let common = lca(incoming);
    let resolved = if common.is_empty() {
        root.clone()
    } else {
        BranchPath::from(common)
    };
    lineage.record_convergence(&resolved);
    resolved
}

/// Level of a target reached from a source at `source_level`.
pub fn next_level(source_level: u32, target_level: u32) -> u32 {
    let level = source_level + 1;
    if target_level > 1 {
        target_level.max(level)
    } else {
        level
    }
}
