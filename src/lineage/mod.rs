// Session-scoped lineage bookkeeping.
//
// Three maps, all owned by one diagram session and never rewound by undo:
// 1. parent -> children adjacency, one entry per accepted connection
// 2. branch path -> last child suffix handed out under it
// 3. LCA path -> number of convergences resolved to it

use std::collections::HashMap;

use indexmap::IndexSet;

use crate::graph::NodeId;

mod branch;

pub use branch::{lca, BranchPath};

#[derive(Debug, Clone, Default)]
pub struct LineageRegistry {
    /// Insertion-ordered so propagation visits children in connect order.
    children: HashMap<NodeId, IndexSet<NodeId>>,
    branch_counters: HashMap<BranchPath, u32>,
    convergence_counters: HashMap<BranchPath, u32>,
}

impl LineageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_link(&mut self, parent: NodeId, child: NodeId) {
        self.children.entry(parent).or_default().insert(child);
    }

    /// Children recorded for a node, in the order they were linked.
    pub fn children_of(&self, parent: NodeId) -> Vec<NodeId> {
        self.children
            .get(&parent)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Read-or-default-then-increment. The first suffix under a path is 1.
    pub fn next_branch_suffix(&mut self, path: &BranchPath) -> u32 {
        let counter = self.branch_counters.entry(path.clone()).or_insert(0);
        *counter += 1;
        *counter
    }

    /// Next unused child path under `path`.
    pub fn next_child_branch(&mut self, path: &BranchPath) -> BranchPath {
        let suffix = self.next_branch_suffix(path);
        path.child(suffix)
    }

    pub fn record_convergence(&mut self, lca: &BranchPath) -> u32 {
        let counter = self.convergence_counters.entry(lca.clone()).or_insert(0);
        *counter += 1;
        *counter
    }

    pub fn convergence_count(&self, lca: &BranchPath) -> u32 {
        self.convergence_counters.get(lca).copied().unwrap_or(0)
    }

    pub fn branch_count(&self, path: &BranchPath) -> u32 {
        self.branch_counters.get(path).copied().unwrap_or(0)
    }

    /// Drop a deleted node: its own child set and its membership in others.
    pub fn forget_node(&mut self, id: NodeId) {
        self.children.remove(&id);
        for set in self.children.values_mut() {
            set.shift_remove(&id);
        }
    }
}
