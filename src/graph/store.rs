//! Holds the live (nodes, edges) snapshot.
//!
//! Callers never edit the lists in place: they build a full replacement
//! and publish it with [`GraphStore::replace`], so a half-applied mutation
//! is never observable.

use crate::graph::{Node, NodeId, Snapshot};

#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    current: Snapshot,
}

impl GraphStore {
    pub fn current(&self) -> &Snapshot {
        &self.current
    }

    pub fn replace(&mut self, snapshot: Snapshot) {
        self.current = snapshot;
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.current.node(id)
    }
}
