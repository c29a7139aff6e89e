//! One diagram session.
//!
//! Each operation runs to completion before returning: validation, branch
//! naming, propagation, publishing the new snapshot and recording it in the
//! history, exactly once, with the settled state.

use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::graph::{Edge, GraphStore, Node, NodeId, NodeKind, PointF, Snapshot};
use crate::history::History;
use crate::layout::equispaced;
use crate::lineage::LineageRegistry;
use crate::propagate::propagate;
use crate::resolve::{incoming_branches, next_level, outgoing_branch, resolve_convergence};
use crate::validate::{validate, Rejection};

/// Result of an accepted connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Connected {
    pub nodes: Vec<Node>,
    pub edge: Edge,
}

#[derive(Debug)]
pub struct FlowEngine {
    config: EngineConfig,
    store: GraphStore,
    lineage: LineageRegistry,
    history: History,
    next_id: u32,
}

impl Default for FlowEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl FlowEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            store: GraphStore::default(),
            lineage: LineageRegistry::new(),
            history: History::default(),
            next_id: 1,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn snapshot(&self) -> &Snapshot {
        self.store.current()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.store.node(id)
    }

    pub fn lineage(&self) -> &LineageRegistry {
        &self.lineage
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn add_node(&mut self, kind: NodeKind, position: PointF) -> Node {
        let id = NodeId(self.next_id);
        self.next_id += 1;

        let mut node = Node::new(id, kind, position);
        if kind == NodeKind::ImageVariant {
            node.image_url = self.config.image_url.clone();
        }

        let current = self.store.current();
        let mut nodes = current.nodes.clone();
        nodes.push(node.clone());
        let edges = current.edges.clone();

        debug!(%id, ?kind, "node added");
        self.publish(Snapshot { nodes, edges });
        node
    }

    pub fn connect(&mut self, source: NodeId, target: NodeId) -> Result<Connected, Rejection> {
        let current = self.store.current();
        let source_node = current
            .node(source)
            .ok_or(Rejection::UnknownNode(source))?;
        let target_node = current
            .node(target)
            .ok_or(Rejection::UnknownNode(target))?;

        if let Err(rejection) = validate(source_node, target_node, &current.edges) {
            debug!(%source, %target, reason = %rejection, "connection rejected");
            return Err(rejection);
        }

        let branch = outgoing_branch(source_node, &mut self.lineage);
        let level = next_level(source_node.level, target_node.level);
        let root = self.config.root_branch();

        let join_branch = if target_node.is_join() {
            let mut incoming = incoming_branches(target, &current.nodes, &current.edges, None);
            incoming.push(branch.clone());
            Some(resolve_convergence(&incoming, &mut self.lineage, &root))
        } else {
            None
        };
        let target_has_outgoing = current.out_degree(target) > 0;

        let mut nodes = current.nodes.clone();
        for node in nodes.iter_mut() {
            if node.id == source {
                // A join target becomes the new branch end; the source keeps its marker.
                if join_branch.is_none() {
                    node.terminal = false;
                }
            } else if node.id == target {
                node.level = level;
                match &join_branch {
                    Some(resolved) => {
                        node.branch = Some(resolved.clone());
                        node.terminal = node.terminal || !target_has_outgoing;
                    }
                    None => {
                        node.branch = Some(branch.clone());
                        node.terminal = true;
                    }
                }
            }
        }

        if let Some(resolved) = &join_branch {
            nodes = propagate(target, resolved, nodes, &current.edges, &mut self.lineage, &root);
        }
        self.lineage.record_link(source, target);

        let edge = Edge::new(source, target);
        let mut edges = current.edges.clone();
        edges.push(edge.clone());

        let converged = join_branch.is_some();
        debug!(%source, %target, %branch, converged, "connection accepted");
        self.publish(Snapshot {
            nodes: nodes.clone(),
            edges,
        });
        Ok(Connected { nodes, edge })
    }

    /// Position-only change, still recorded so drags can be undone.
    pub fn move_node(&mut self, id: NodeId, position: PointF) -> Option<&[Node]> {
        let current = self.store.current();
        if current.node(id).is_none() {
            warn!(%id, "move of unknown node ignored");
            return None;
        }

        let nodes = current
            .nodes
            .iter()
            .map(|n| {
                if n.id == id {
                    Node { position, ..n.clone() }
                } else {
                    n.clone()
                }
            })
            .collect();
        let edges = current.edges.clone();

        self.publish(Snapshot { nodes, edges });
        Some(self.store.current().nodes.as_slice())
    }

    /// Removes the node, its incident edges and its lineage entries. The
    /// node's parent is not re-linked to its children and nothing is
    /// re-propagated.
    pub fn delete_node(&mut self, id: NodeId) -> Option<&Snapshot> {
        let current = self.store.current();
        if current.node(id).is_none() {
            warn!(%id, "delete of unknown node ignored");
            return None;
        }

        let nodes = current.nodes.iter().filter(|n| n.id != id).cloned().collect();
        let edges = current.edges.iter().filter(|e| !e.touches(id)).cloned().collect();
        self.lineage.forget_node(id);

        debug!(%id, "node deleted");
        self.publish(Snapshot { nodes, edges });
        Some(self.store.current())
    }

    pub fn undo(&mut self) -> &Snapshot {
        if let Some(previous) = self.history.undo() {
            self.store.replace(previous.clone());
            debug!(cursor = self.history.cursor(), "undo");
        }
        self.store.current()
    }

    pub fn redo(&mut self) -> &Snapshot {
        if let Some(next) = self.history.redo() {
            self.store.replace(next.clone());
            debug!(cursor = self.history.cursor(), "redo");
        }
        self.store.current()
    }

    pub fn layout_equispaced(&mut self, container_width: f64) -> &[Node] {
        let current = self.store.current();
        let nodes = equispaced(&current.nodes, container_width, &self.config.layout);
        let edges = current.edges.clone();

        self.publish(Snapshot { nodes, edges });
        &self.store.current().nodes
    }

    fn publish(&mut self, snapshot: Snapshot) {
        self.history.record(snapshot.clone());
        self.store.replace(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lineage::BranchPath;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn engine() -> FlowEngine {
        FlowEngine::default()
    }

    fn add(engine: &mut FlowEngine, kind: NodeKind) -> NodeId {
        engine.add_node(kind, PointF::default()).id
    }

    fn branch(engine: &FlowEngine, id: NodeId) -> Option<String> {
        engine
            .node(id)
            .and_then(|n| n.branch.as_ref())
            .map(|b| b.to_string())
    }

    #[test]
    fn test_add_node_allocates_ids_and_titles() {
        let mut e = engine();
        let a = e.add_node(NodeKind::Regular, PointF { x: 3.0, y: 4.0 });
        let j = e.add_node(NodeKind::Join, PointF::default());

        assert_eq!(a.id, NodeId(1));
        assert_eq!(a.title, "Regular Node 1");
        assert_eq!(a.level, 1);
        assert_eq!(a.branch, None);
        assert_eq!(j.title, "Join Node 2");
        assert_eq!(e.snapshot().nodes.len(), 2);
        assert_eq!(e.history().snapshot_count(), 3);
    }

    #[test]
    fn test_image_nodes_get_configured_url() {
        let config = EngineConfig {
            image_url: Some("logo.png".to_string()),
            ..EngineConfig::default()
        };
        let mut e = FlowEngine::new(config);
        let img = e.add_node(NodeKind::ImageVariant, PointF::default());
        let icon = e.add_node(NodeKind::IconVariant, PointF::default());

        assert_eq!(img.image_url.as_deref(), Some("logo.png"));
        assert_eq!(icon.image_url, None);
    }

    #[test]
    fn test_linear_extension_moves_terminal_forward() {
        let mut e = engine();
        let a = add(&mut e, NodeKind::Regular);
        let b = add(&mut e, NodeKind::Regular);
        let c = add(&mut e, NodeKind::Regular);

        e.connect(a, b).unwrap();
        assert_eq!(branch(&e, b).as_deref(), Some("b_node_1"));
        assert!(e.node(b).unwrap().terminal);
        assert_eq!(e.node(b).unwrap().level, 2);
        // The root keeps no branch of its own.
        assert_eq!(branch(&e, a), None);

        e.connect(b, c).unwrap();
        assert!(!e.node(b).unwrap().terminal);
        assert!(e.node(c).unwrap().terminal);
        assert_eq!(branch(&e, c).as_deref(), Some("b_node_1"));
        assert_eq!(e.node(c).unwrap().level, 3);
        assert_eq!(
            e.node(c).unwrap().label(),
            "Regular Node 3 - Parallel End b_node_1"
        );
    }

    #[test]
    fn test_divergence_counter_survives_undo() {
        let mut e = engine();
        let j = add(&mut e, NodeKind::Join);
        let x = add(&mut e, NodeKind::Regular);
        let y = add(&mut e, NodeKind::Regular);
        let z = add(&mut e, NodeKind::Regular);

        e.connect(j, x).unwrap();
        e.connect(j, y).unwrap();
        assert_eq!(branch(&e, x).as_deref(), Some("b_node_1.1"));
        assert_eq!(branch(&e, y).as_deref(), Some("b_node_1.2"));

        e.undo();
        assert_eq!(branch(&e, y), None);
        e.redo();
        assert_eq!(branch(&e, y).as_deref(), Some("b_node_1.2"));

        e.undo();
        e.connect(j, z).unwrap();
        assert_eq!(branch(&e, z).as_deref(), Some("b_node_1.3"));
        assert!(!e.history().can_redo());
    }

    #[test]
    fn test_convergence_scenario_with_disjoint_roots() {
        let mut e = engine();
        let a = add(&mut e, NodeKind::Regular);
        let b = add(&mut e, NodeKind::Regular);
        let c = add(&mut e, NodeKind::Join);

        e.connect(a, c).unwrap();
        assert_eq!(branch(&e, c).as_deref(), Some("b_node_1"));
        assert!(e.node(c).unwrap().terminal);

        e.connect(b, c).unwrap();
        assert_eq!(branch(&e, c).as_deref(), Some("root"));
        assert_eq!(e.node(c).unwrap().label(), "Join Node 3 - Parallel End root");
        assert_eq!(e.lineage().convergence_count(&BranchPath::from("root")), 1);
    }

    #[test]
    fn test_siblings_converge_to_common_ancestor() {
        let mut e = engine();
        let j = add(&mut e, NodeKind::Join);
        let x = add(&mut e, NodeKind::Regular);
        let y = add(&mut e, NodeKind::Regular);
        let k = add(&mut e, NodeKind::Join);

        e.connect(j, x).unwrap();
        e.connect(j, y).unwrap();
        e.connect(x, k).unwrap();
        assert_eq!(branch(&e, k).as_deref(), Some("b_node_1.1"));
        // Source keeps its end marker when the target is a join.
        assert!(e.node(x).unwrap().terminal);

        e.connect(y, k).unwrap();
        assert_eq!(branch(&e, k).as_deref(), Some("b_node_1"));
        assert_eq!(
            e.lineage().convergence_count(&BranchPath::from("b_node_1")),
            1
        );
    }

    #[test]
    fn test_relabelled_join_propagates_to_descendants() {
        let mut e = engine();
        let a = add(&mut e, NodeKind::Regular);
        let k = add(&mut e, NodeKind::Join);
        let d = add(&mut e, NodeKind::Regular);
        let f = add(&mut e, NodeKind::Regular);

        // K -> D -> F first, then feed K from A.
        e.connect(k, d).unwrap();
        e.connect(d, f).unwrap();
        assert_eq!(branch(&e, f).as_deref(), Some("b_node_2.1"));

        e.connect(a, k).unwrap();
        assert_eq!(branch(&e, k).as_deref(), Some("b_node_1"));
        assert_eq!(branch(&e, d).as_deref(), Some("b_node_1.1"));
        assert_eq!(branch(&e, f).as_deref(), Some("b_node_1.1.1"));
        assert_eq!(
            e.node(f).unwrap().label(),
            "Regular Node 4 - Parallel End b_node_1.1.1"
        );
        // K already fans out, so it is not the end of a branch.
        assert!(!e.node(k).unwrap().terminal);
        assert_eq!(e.node(k).unwrap().label(), "Join Node 2 - b_node_1");
    }

    #[test]
    fn test_undo_restores_exact_pre_connect_state() {
        let mut e = engine();
        let a = add(&mut e, NodeKind::Regular);
        let b = add(&mut e, NodeKind::Regular);
        let before = e.snapshot().clone();

        e.connect(a, b).unwrap();
        let after = e.snapshot().clone();

        assert_eq!(e.undo(), &before);
        assert_eq!(e.redo(), &after);
    }

    #[test]
    fn test_rejections_do_not_touch_history() {
        let mut e = engine();
        let a = add(&mut e, NodeKind::Regular);
        let len = e.history().snapshot_count();

        assert_eq!(e.connect(a, a), Err(Rejection::SelfLoop));
        assert_eq!(
            e.connect(a, NodeId(99)),
            Err(Rejection::UnknownNode(NodeId(99)))
        );
        assert_eq!(e.history().snapshot_count(), len);
    }

    #[test]
    fn test_duplicate_connection_rejected() {
        let mut e = engine();
        let j = add(&mut e, NodeKind::Join);
        let x = add(&mut e, NodeKind::Regular);
        e.connect(j, x).unwrap();
        assert_eq!(e.connect(j, x), Err(Rejection::AlreadyConnected));
    }

    #[test]
    fn test_move_node_is_undoable() {
        let mut e = engine();
        let a = add(&mut e, NodeKind::Regular);
        let to = PointF { x: 10.0, y: 20.0 };

        assert!(e.move_node(a, to).is_some());
        assert_eq!(e.node(a).unwrap().position, to);
        e.undo();
        assert_eq!(e.node(a).unwrap().position, PointF::default());
        assert!(e.move_node(NodeId(42), to).is_none());
    }

    #[test]
    fn test_delete_node_cuts_edges_and_lineage() {
        let mut e = engine();
        let j = add(&mut e, NodeKind::Join);
        let x = add(&mut e, NodeKind::Regular);
        let y = add(&mut e, NodeKind::Regular);
        e.connect(j, x).unwrap();
        e.connect(x, y).unwrap();

        let snap = e.delete_node(x).unwrap();
        assert_eq!(snap.nodes.len(), 2);
        assert!(snap.edges.is_empty());
        assert!(e.lineage().children_of(j).is_empty());
        assert!(e.lineage().children_of(x).is_empty());
        // Hard cut: y keeps its branch.
        assert_eq!(branch(&e, y).as_deref(), Some("b_node_1.1"));
        assert!(e.delete_node(x).is_none());
    }

    #[test]
    fn test_undone_link_is_not_relabelled() {
        let mut e = engine();
        let j = add(&mut e, NodeKind::Join);
        let x = add(&mut e, NodeKind::Regular);
        let a = add(&mut e, NodeKind::Regular);
        let b = add(&mut e, NodeKind::Regular);

        e.connect(j, x).unwrap();
        e.undo();
        // The registry keeps j -> x, but the edge is gone.
        assert_eq!(e.lineage().children_of(j), vec![x]);

        e.connect(a, x).unwrap();
        assert_eq!(branch(&e, x).as_deref(), Some("b_node_3"));

        e.connect(b, j).unwrap();
        assert_eq!(branch(&e, j).as_deref(), Some("b_node_4"));
        assert_eq!(branch(&e, x).as_deref(), Some("b_node_3"));
    }

    #[test]
    fn test_layout_is_recorded() {
        let mut e = engine();
        let j = add(&mut e, NodeKind::Join);
        let x = add(&mut e, NodeKind::Regular);
        let y = add(&mut e, NodeKind::Regular);
        e.connect(j, x).unwrap();
        e.connect(j, y).unwrap();

        let nodes = e.layout_equispaced(1000.0).to_vec();
        assert_eq!(nodes[0].position, PointF { x: 500.0, y: 100.0 });
        assert_eq!(nodes[1].position, PointF { x: 250.0, y: 350.0 });
        assert_eq!(nodes[2].position, PointF { x: 750.0, y: 350.0 });

        e.undo();
        assert_eq!(e.node(x).unwrap().position, PointF::default());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(NodeKind),
        Connect(u32, u32),
        Undo,
        Redo,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            prop_oneof![
                Just(NodeKind::Regular),
                Just(NodeKind::Join),
                Just(NodeKind::IconVariant),
            ]
            .prop_map(Op::Add),
            (1..12u32, 1..12u32).prop_map(|(a, b)| Op::Connect(a, b)),
            (1..12u32, 1..12u32).prop_map(|(a, b)| Op::Connect(a, b)),
            Just(Op::Undo),
            Just(Op::Redo),
        ]
    }

    fn is_acyclic(snapshot: &Snapshot) -> bool {
        // Kahn's algorithm: every node must drain.
        let mut indegree: std::collections::HashMap<NodeId, usize> =
            snapshot.nodes.iter().map(|n| (n.id, 0)).collect();
        for e in &snapshot.edges {
            *indegree.entry(e.target).or_default() += 1;
        }
        let mut ready: Vec<NodeId> = indegree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut drained = 0;
        while let Some(id) = ready.pop() {
            drained += 1;
            for e in snapshot.edges.iter().filter(|e| e.source == id) {
                if let Some(d) = indegree.get_mut(&e.target) {
                    *d -= 1;
                    if *d == 0 {
                        ready.push(e.target);
                    }
                }
            }
        }
        drained == indegree.len()
    }

    proptest! {
        #[test]
        fn prop_graph_stays_a_dag_with_bounded_fan_out(
            ops in proptest::collection::vec(op(), 0..60)
        ) {
            let mut e = engine();
            for op in ops {
                match op {
                    Op::Add(kind) => { add(&mut e, kind); }
                    Op::Connect(a, b) => { let _ = e.connect(NodeId(a), NodeId(b)); }
                    Op::Undo => { e.undo(); }
                    Op::Redo => { e.redo(); }
                }

                let snap = e.snapshot();
                prop_assert!(is_acyclic(snap));
                for node in snap.nodes.iter().filter(|n| !n.is_join()) {
                    prop_assert!(snap.out_degree(node.id) <= 1);
                }
                for edge in &snap.edges {
                    prop_assert_ne!(edge.source, edge.target);
                    prop_assert!(snap.node(edge.target).is_some_and(|n| n.branch.is_some()));
                }
            }
        }
    }
}
