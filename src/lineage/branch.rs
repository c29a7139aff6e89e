// Hierarchical branch paths.
//
// A path is a dot-separated list of segments, e.g. `b_node_1.2.1`:
// - divergence from a join appends one numeric segment
// - convergence at a join keeps the longest shared leading run of segments

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::graph::NodeId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchPath(String);

impl BranchPath {
    /// Path for a node that never received a branch: `b_<node id>`.
    pub fn synthesized(id: NodeId) -> Self {
        Self(format!("b_{}", id))
    }

    /// `self.<suffix>`
    pub fn child(&self, suffix: u32) -> Self {
        Self(format!("{}.{}", self.0, suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }
}

impl fmt::Display for BranchPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BranchPath {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for BranchPath {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for BranchPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Longest common leading run of segments across all paths.
///
/// Segments are compared position by position and the scan stops at the
/// first mismatch. Returns `""` for an empty input or when the paths share
/// no leading segment.
pub fn lca<S: AsRef<str>>(paths: &[S]) -> String {
    let Some((first, rest)) = paths.split_first() else {
        return String::new();
    };

    let mut prefix: Vec<&str> = first.as_ref().split('.').collect();
    for path in rest {
        let shared = prefix
            .iter()
            .zip(path.as_ref().split('.'))
            .take_while(|(a, b)| *a == b)
            .count();
        prefix.truncate(shared);
        if prefix.is_empty() {
            break;
        }
    }

    prefix.join(".")
}
