use crate::metrics::MetricsEngine;
use crate::node::{MapNode, NodeArena};
use conceptmap_core::{Crosslink, GraphError, GraphMetrics, NodeId, NodeIdAllocator, Point};
use conceptmap_events::{Event, publish};
use crossbeam_channel::Sender;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// The concept map being annotated for one image.
///
/// Every mutation recomputes the derived metrics before returning. The
/// model is single-writer: hosts that share it between actors must
/// serialize access themselves.
///
/// Deleting a node goes further than removing it and its crosslinks: any
/// node left without a path to the root is pruned too, so every node the
/// model holds stays reachable from the root and crosslink distances are
/// always defined.
#[derive(Debug, Clone, Default)]
pub struct GraphModel {
    nodes: NodeArena,
    ids: NodeIdAllocator,
    root: Option<NodeId>,
    current: Option<NodeId>,
    crosslinks: Vec<Crosslink>,
    prior_knowledge: Option<i64>,
    questions: Option<i64>,
    image_path: Option<PathBuf>,
    output_path: Option<PathBuf>,
    metrics: GraphMetrics,
    events: Option<Sender<Event>>,
}

impl GraphModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish change notifications on `events` after each mutation.
    pub fn with_events(mut self, events: Sender<Event>) -> Self {
        self.events = Some(events);
        self
    }

    /// Swap the notification channel; `None` stops publishing.
    pub fn set_events(&mut self, events: Option<Sender<Event>>) {
        self.events = events;
    }

    pub fn with_id_allocator(mut self, ids: NodeIdAllocator) -> Self {
        self.ids = ids;
        self
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Add a node at `position`, attached to the current selection.
    ///
    /// The first node becomes the root. The new node becomes current.
    pub fn add_node(&mut self, position: Point) -> Result<NodeId, GraphError> {
        let attach_to = match (self.root, self.current) {
            (None, _) => None,
            (Some(_), Some(current)) => Some(current),
            (Some(_), None) => {
                return Err(GraphError::InvalidState(
                    "no current node to attach the new node to".to_string(),
                ));
            }
        };

        let id = self.ids.allocate();
        self.nodes.insert(MapNode::new(id, position));
        match attach_to {
            Some(current) => self.nodes.connect(current, id)?,
            None => self.root = Some(id),
        }
        self.current = Some(id);

        tracing::debug!("Added node {} at ({}, {})", id, position.x, position.y);
        self.emit(Event::NodeAdded {
            id,
            attached_to: attach_to,
        });
        self.emit(Event::CurrentChanged { id: Some(id) });
        self.recompute()?;
        Ok(id)
    }

    /// Connect `a` and `b` with a normal edge.
    ///
    /// Returns `false` without changing anything when an edge or a crosslink
    /// already joins the pair.
    pub fn add_edge(&mut self, a: NodeId, b: NodeId) -> Result<bool, GraphError> {
        if !self.check_pair(a, b)? {
            tracing::debug!("Edge {} - {} already present, not adding duplicate", a, b);
            return Ok(false);
        }

        self.nodes.connect(a, b)?;
        self.emit(Event::EdgeAdded { a, b });
        self.recompute()?;
        Ok(true)
    }

    /// Record a crosslink between `a` and `b`.
    ///
    /// Returns `false` without changing anything when an edge or a crosslink
    /// already joins the pair.
    pub fn add_crosslink(&mut self, a: NodeId, b: NodeId) -> Result<bool, GraphError> {
        if !self.check_pair(a, b)? {
            tracing::debug!("Crosslink {} - {} already present, not adding duplicate", a, b);
            return Ok(false);
        }

        self.crosslinks.push(Crosslink::new(a, b));
        self.emit(Event::CrosslinkAdded { a, b });
        self.recompute()?;
        Ok(true)
    }

    /// Delete the current node.
    ///
    /// Deleting the root resets the whole graph. Nodes left without a path
    /// to the root are pruned together with their crosslinks. Returns the
    /// deleted id, or `None` when nothing was selected.
    pub fn delete_current_node(&mut self) -> Result<Option<NodeId>, GraphError> {
        let Some(current) = self.current else {
            return Ok(None);
        };

        if Some(current) == self.root {
            self.reset_graph();
            return Ok(Some(current));
        }

        self.nodes.remove(current);
        self.crosslinks.retain(|link| !link.touches(current));
        self.current = None;
        let pruned = self.prune_unreachable();

        tracing::debug!("Deleted node {} (pruned {} detached)", current, pruned.len());
        self.emit(Event::NodeDeleted {
            id: current,
            pruned,
        });
        self.emit(Event::CurrentChanged { id: None });
        self.recompute()?;
        Ok(Some(current))
    }

    /// Discard every node, crosslink and manual annotation.
    ///
    /// Image and output paths are kept; the export flow advances them.
    pub fn reset_graph(&mut self) {
        self.nodes.clear();
        self.root = None;
        self.current = None;
        self.crosslinks.clear();
        self.prior_knowledge = None;
        self.questions = None;
        self.metrics = GraphMetrics::default();

        tracing::debug!("Graph reset");
        self.emit(Event::GraphReset);
        self.emit(Event::MetricsUpdated(self.metrics));
    }

    /// Move the selection cursor. `None` clears it.
    pub fn set_current(&mut self, id: Option<NodeId>) -> Result<(), GraphError> {
        if let Some(id) = id {
            self.nodes.require(id)?;
        }
        if self.current != id {
            self.current = id;
            self.emit(Event::CurrentChanged { id });
        }
        Ok(())
    }

    pub fn set_prior_knowledge(&mut self, value: Option<i64>) {
        self.prior_knowledge = value;
    }

    pub fn set_questions(&mut self, value: Option<i64>) {
        self.questions = value;
    }

    pub fn set_image_path(&mut self, path: Option<PathBuf>) {
        self.image_path = path;
    }

    pub fn set_output_path(&mut self, path: Option<PathBuf>) {
        self.output_path = path;
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn current(&self) -> Option<NodeId> {
        self.current
    }

    pub fn node(&self, id: NodeId) -> Option<&MapNode> {
        self.nodes.get(id)
    }

    pub fn neighbors(&self, id: NodeId) -> Result<&[NodeId], GraphError> {
        Ok(self.nodes.require(id)?.neighbors())
    }

    /// All nodes reachable from the root, breadth-first.
    pub fn nodes(&self) -> Vec<&MapNode> {
        self.node_ids()
            .into_iter()
            .filter_map(|id| self.nodes.get(id))
            .collect()
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.root
            .map(|root| self.nodes.whole_graph(root))
            .unwrap_or_default()
    }

    pub fn main_ideas(&self) -> &[NodeId] {
        MetricsEngine::main_ideas(&self.nodes, self.root)
    }

    pub fn crosslinks(&self) -> &[Crosslink] {
        &self.crosslinks
    }

    /// Hop distance between two nodes of this graph.
    pub fn distance_between(&self, a: NodeId, b: NodeId) -> Result<usize, GraphError> {
        self.nodes.hop_distance(a, b)
    }

    pub fn metrics(&self) -> GraphMetrics {
        self.metrics
    }

    pub fn prior_knowledge(&self) -> Option<i64> {
        self.prior_knowledge
    }

    pub fn questions(&self) -> Option<i64> {
        self.questions
    }

    pub fn image_path(&self) -> Option<&Path> {
        self.image_path.as_deref()
    }

    pub fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }

    /// A graph exists and both the image and the log destination are known.
    pub fn is_completable(&self) -> bool {
        self.root.is_some() && self.image_path.is_some() && self.output_path.is_some()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Validate the pair and report whether it is still unconnected.
    fn check_pair(&self, a: NodeId, b: NodeId) -> Result<bool, GraphError> {
        let node_a = self.nodes.require(a)?;
        let node_b = self.nodes.require(b)?;
        if a == b {
            return Err(GraphError::InvalidState(format!(
                "cannot connect node {a} to itself"
            )));
        }

        let forward = node_a.has_neighbor(b);
        let backward = node_b.has_neighbor(a);
        if forward != backward {
            return Err(GraphError::CorruptGraph { a, b });
        }

        let linked = self.crosslinks.iter().any(|link| link.joins(a, b));
        Ok(!forward && !linked)
    }

    fn prune_unreachable(&mut self) -> Vec<NodeId> {
        let reachable: HashSet<NodeId> = self.node_ids().into_iter().collect();
        let mut detached: Vec<NodeId> = self
            .nodes
            .ids()
            .filter(|id| !reachable.contains(id))
            .collect();
        detached.sort();

        for &id in &detached {
            self.nodes.remove(id);
        }
        self.crosslinks
            .retain(|link| !detached.iter().any(|&id| link.touches(id)));
        detached
    }

    fn recompute(&mut self) -> Result<(), GraphError> {
        self.metrics = MetricsEngine::compute(&self.nodes, self.root, &self.crosslinks)?;
        tracing::debug!(
            "Calculated width={} depth={} details={} crosslink_dist={}",
            self.metrics.width,
            self.metrics.depth,
            self.metrics.max_num_details,
            self.metrics.max_crosslink_dist
        );
        self.emit(Event::MetricsUpdated(self.metrics));
        Ok(())
    }

    fn emit(&self, event: Event) {
        if let Some(tx) = &self.events {
            publish(tx, event);
        }
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;

    #[derive(Debug, Clone)]
    enum Op {
        AddNode,
        AddEdge(usize, usize),
        AddCrosslink(usize, usize),
        Select(usize),
        ClearSelection,
        DeleteCurrent,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            4 => Just(Op::AddNode),
            2 => (0usize..32, 0usize..32).prop_map(|(a, b)| Op::AddEdge(a, b)),
            1 => (0usize..32, 0usize..32).prop_map(|(a, b)| Op::AddCrosslink(a, b)),
            2 => (0usize..32).prop_map(Op::Select),
            1 => Just(Op::ClearSelection),
            1 => Just(Op::DeleteCurrent),
        ]
    }

    fn pick(model: &GraphModel, i: usize) -> Option<NodeId> {
        let ids = model.node_ids();
        if ids.is_empty() {
            None
        } else {
            Some(ids[i % ids.len()])
        }
    }

    /// Apply `op`, ignoring rejections that the public API reports as errors.
    fn apply(model: &mut GraphModel, op: &Op) {
        match *op {
            Op::AddNode => {
                let _ = model.add_node(Point::default());
            }
            Op::AddEdge(a, b) => {
                if let (Some(a), Some(b)) = (pick(model, a), pick(model, b)) {
                    let _ = model.add_edge(a, b);
                }
            }
            Op::AddCrosslink(a, b) => {
                if let (Some(a), Some(b)) = (pick(model, a), pick(model, b)) {
                    let _ = model.add_crosslink(a, b);
                }
            }
            Op::Select(i) => {
                let _ = model.set_current(pick(model, i));
            }
            Op::ClearSelection => {
                let _ = model.set_current(None);
            }
            Op::DeleteCurrent => {
                let _ = model.delete_current_node();
            }
        }
    }

    fn build(ops: &[Op]) -> GraphModel {
        let mut model = GraphModel::new();
        for op in ops {
            apply(&mut model, op);
        }
        model
    }

    /// Reference layering: hop distance from the root for every node.
    fn reference_width_depth(model: &GraphModel) -> (usize, i32) {
        let Some(root) = model.root() else {
            return (0, -1);
        };
        let mut per_level: HashMap<usize, usize> = HashMap::new();
        for id in model.node_ids() {
            let hops = model.distance_between(root, id).unwrap();
            *per_level.entry(hops).or_default() += 1;
        }
        let width = per_level.values().copied().max().unwrap_or(0);
        let depth = per_level.keys().copied().max().map(|d| d as i32).unwrap_or(-1);
        (width, depth)
    }

    fn adjacency(model: &GraphModel) -> Vec<(NodeId, Vec<NodeId>)> {
        let mut all: Vec<(NodeId, Vec<NodeId>)> = model
            .nodes()
            .into_iter()
            .map(|node| {
                let mut neighbors = node.neighbors().to_vec();
                neighbors.sort();
                (node.id, neighbors)
            })
            .collect();
        all.sort();
        all
    }

    proptest! {
        /// Neighbor membership stays symmetric through every public operation.
        #[test]
        fn prop_neighbors_symmetric(ops in prop::collection::vec(op_strategy(), 0..60)) {
            let model = build(&ops);
            for node in model.nodes() {
                for &neighbor in node.neighbors() {
                    prop_assert!(model.node(neighbor).unwrap().has_neighbor(node.id));
                    prop_assert_ne!(neighbor, node.id);
                }
            }
        }

        #[test]
        fn prop_edge_count_is_half_degree_sum(ops in prop::collection::vec(op_strategy(), 0..60)) {
            let model = build(&ops);
            let degree_sum: usize = model.nodes().iter().map(|n| n.neighbors().len()).sum();
            prop_assert_eq!(model.metrics().num_edges * 2, degree_sum);
            prop_assert_eq!(model.metrics().num_nodes, model.nodes().len());
        }

        #[test]
        fn prop_width_depth_match_reference(ops in prop::collection::vec(op_strategy(), 1..60)) {
            let model = build(&ops);
            prop_assume!(model.root().is_some());
            let metrics = model.metrics();
            prop_assert_eq!((metrics.width, metrics.depth), reference_width_depth(&model));
        }

        #[test]
        fn prop_add_edge_idempotent(
            ops in prop::collection::vec(op_strategy(), 1..40),
            a in 0usize..32,
            b in 0usize..32,
            crosslink in any::<bool>(),
        ) {
            let mut once = build(&ops);
            let (Some(x), Some(y)) = (pick(&once, a), pick(&once, b)) else {
                return Ok(());
            };
            prop_assume!(x != y);

            let mut twice = once.clone();
            if crosslink {
                let _ = once.add_crosslink(x, y);
                let _ = twice.add_crosslink(x, y);
                let _ = twice.add_crosslink(y, x);
            } else {
                let _ = once.add_edge(x, y);
                let _ = twice.add_edge(x, y);
                let _ = twice.add_edge(y, x);
            }

            prop_assert_eq!(adjacency(&once), adjacency(&twice));
            prop_assert_eq!(once.crosslinks(), twice.crosslinks());
            prop_assert_eq!(once.metrics(), twice.metrics());
        }

        /// Deleting a non-root node only touches that node and anything it detached.
        #[test]
        fn prop_delete_leaves_other_adjacency(ops in prop::collection::vec(op_strategy(), 1..60), i in 0usize..32) {
            let mut model = build(&ops);
            let Some(target) = pick(&model, i) else {
                return Ok(());
            };
            prop_assume!(Some(target) != model.root());

            let before = adjacency(&model);
            model.set_current(Some(target)).unwrap();
            model.delete_current_node().unwrap();

            prop_assert!(model.node(target).is_none());
            prop_assert!(model.crosslinks().iter().all(|link| !link.touches(target)));
            for (id, neighbors) in adjacency(&model) {
                let (_, old) = before.iter().find(|(old_id, _)| *old_id == id).unwrap();
                let expected: Vec<NodeId> =
                    old.iter().copied().filter(|&n| n != target).collect();
                prop_assert_eq!(neighbors, expected);
            }
        }
    }
}
