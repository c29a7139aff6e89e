//! Branch-lineage engine for parallel-process diagrams.
//!
//! Nodes are wired into a DAG; connections out of join nodes open numbered
//! sub-branches (`b_node_1.2`), and connections into join nodes converge to
//! the longest common branch prefix, which is then pushed down to every
//! recorded descendant. Every settled change is kept in a linear undo/redo
//! history.

pub mod config;
pub mod engine;
pub mod graph;
pub mod history;
pub mod layout;
pub mod lineage;
pub mod output;
pub mod propagate;
pub mod resolve;
pub mod validate;
mod wasm;

pub use config::{EngineConfig, Palette};
pub use engine::{Connected, FlowEngine};
pub use graph::{Edge, Node, NodeId, NodeKind, PointF, Snapshot};
pub use lineage::{lca, BranchPath, LineageRegistry};
pub use validate::Rejection;
pub use wasm::FlowSession;
