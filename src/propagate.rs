// Descendant relabelling after a join changes branch.
//
// Walks the lineage adjacency depth-first with an explicit stack, in the
// same pre-order a recursive walk would use. A recorded link is only
// followed while the edge it came from is still in the graph:
// - a join descendant re-resolves its convergence from its incoming edges,
//   with the edge from the propagating parent carrying the parent's new branch
// - any other descendant takes the next child path under its parent's branch
// The whole walk runs on an owned node list which is returned only once
// every descendant has been updated.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::graph::{Edge, Node, NodeId};
use crate::lineage::{BranchPath, LineageRegistry};
use crate::resolve::{incoming_branches, resolve_convergence};

struct Visit {
    parent: NodeId,
    parent_branch: BranchPath,
    child: NodeId,
}

pub fn propagate(
    start: NodeId,
    new_branch: &BranchPath,
    mut nodes: Vec<Node>,
    edges: &[Edge],
    lineage: &mut LineageRegistry,
    root: &BranchPath,
) -> Vec<Node> {
    let index: HashMap<NodeId, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id, i))
        .collect();

    let mut visited: HashSet<NodeId> = HashSet::from([start]);
    let mut stack = Vec::new();
    push_children(&mut stack, lineage, edges, start, new_branch);

    let mut relabelled = 0usize;
    while let Some(Visit { parent, parent_branch, child }) = stack.pop() {
        let Some(&slot) = index.get(&child) else {
            // Deleted after being linked.
            continue;
        };
        if !visited.insert(child) {
            continue;
        }

        let branch = if nodes[slot].is_join() {
            let substitute = Some((parent, &parent_branch));
            let incoming = incoming_branches(child, &nodes, edges, substitute);
            resolve_convergence(&incoming, lineage, root)
        } else {
            lineage.next_child_branch(&parent_branch)
        };

        nodes[slot].branch = Some(branch.clone());
        relabelled += 1;
        push_children(&mut stack, lineage, edges, child, &branch);
    }

    debug!(%start, branch = %new_branch, relabelled, "propagated branch to descendants");
    nodes
}

/// Push in reverse so the first-linked child is popped first. Links whose
/// edge is gone (undone or deleted) are skipped.
fn push_children(
    stack: &mut Vec<Visit>,
    lineage: &LineageRegistry,
    edges: &[Edge],
    parent: NodeId,
    branch: &BranchPath,
) {
    let live = lineage
        .children_of(parent)
        .into_iter()
        .filter(|&child| edges.iter().any(|e| e.source == parent && e.target == child));
    for child in live.rev() {
        stack.push(Visit {
            parent,
            parent_branch: branch.clone(),
            child,
        });
    }
}
