//! Connection rules.
//!
//! [`validate`] is a pure predicate over two endpoints and the current edge
//! list. Rules run in a fixed order and the first failing rule decides the
//! rejection reason.

use std::collections::HashSet;

use thiserror::Error;

use crate::graph::{Edge, Node, NodeId};
use crate::lineage::BranchPath;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("node {0} does not exist")]
    UnknownNode(NodeId),

    #[error("can't connect a node to itself")]
    SelfLoop,

    #[error("these nodes are already connected")]
    AlreadyConnected,

    #[error("can't connect two join nodes")]
    JoinToJoin,

    #[error("cannot connect nodes from different branches: {from} to {to}")]
    CrossBranch { from: BranchPath, to: BranchPath },

    #[error("this connection creates a loop, which is not allowed")]
    CreatesLoop,

    #[error(
        "can't connect more than one connection from a non-join node; add a join node to fan out"
    )]
    FanOutLimit,

    #[error("target already belongs to a branch; converge through a join node")]
    TargetOnBranch,
}

impl Rejection {
    /// Stable identifier for the UI.
    pub fn code(&self) -> &'static str {
        match self {
            Rejection::UnknownNode(_) => "unknown_node",
            Rejection::SelfLoop => "self_loop",
            Rejection::AlreadyConnected => "already_connected",
            Rejection::JoinToJoin => "join_to_join",
            Rejection::CrossBranch { .. } => "cross_branch",
            Rejection::CreatesLoop => "creates_loop",
            Rejection::FanOutLimit => "fan_out_limit",
            Rejection::TargetOnBranch => "target_on_branch",
        }
    }
}

pub fn validate(source: &Node, target: &Node, edges: &[Edge]) -> Result<(), Rejection> {
    if source.id == target.id {
        return Err(Rejection::SelfLoop);
    }

    if edges
        .iter()
        .any(|e| e.source == source.id && e.target == target.id)
    {
        return Err(Rejection::AlreadyConnected);
    }

    if source.is_join() && target.is_join() {
        return Err(Rejection::JoinToJoin);
    }

    // Different branches may only meet at a join.
    if let (Some(sb), Some(tb)) = (&source.branch, &target.branch) {
        if sb != tb && !target.is_join() {
            return Err(Rejection::CrossBranch {
                from: sb.clone(),
                to: tb.clone(),
            });
        }
    }

    if reaches(target.id, source.id, edges) {
        return Err(Rejection::CreatesLoop);
    }

    if !source.is_join() {
        if edges.iter().any(|e| e.source == source.id) {
            return Err(Rejection::FanOutLimit);
        }
        if !target.is_join() && target.branch.is_some() {
            return Err(Rejection::TargetOnBranch);
        }
    }

    Ok(())
}

/// Whether a directed path `from -> ... -> to` exists.
fn reaches(from: NodeId, to: NodeId, edges: &[Edge]) -> bool {
    let mut seen = HashSet::new();
    let mut stack = vec![from];

    while let Some(current) = stack.pop() {
        if current == to {
            return true;
        }
        if !seen.insert(current) {
            continue;
        }
        stack.extend(
            edges
                .iter()
                .filter(|e| e.source == current)
                .map(|e| e.target),
        );
    }

    false
}
