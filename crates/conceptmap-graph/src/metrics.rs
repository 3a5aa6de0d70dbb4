use crate::node::NodeArena;
use conceptmap_core::{Crosslink, GraphError, GraphMetrics, NodeId};
use std::collections::HashSet;

/// Pure metric computations over a node arena.
pub struct MetricsEngine;

impl MetricsEngine {
    /// Compute every metric for the graph rooted at `root`.
    ///
    /// An empty graph reports width 0 and depth -1.
    pub fn compute(
        nodes: &NodeArena,
        root: Option<NodeId>,
        crosslinks: &[Crosslink],
    ) -> Result<GraphMetrics, GraphError> {
        let all = root.map(|r| nodes.whole_graph(r)).unwrap_or_default();
        let (width, depth) = Self::width_and_depth(nodes, root);

        Ok(GraphMetrics {
            num_nodes: all.len(),
            num_edges: Self::edge_count(nodes, &all),
            width,
            depth,
            num_main_ideas: Self::main_ideas(nodes, root).len(),
            max_num_details: Self::max_num_details(nodes, root),
            num_crosslinks: crosslinks.len(),
            max_crosslink_dist: Self::max_crosslink_distance(nodes, crosslinks)?,
        })
    }

    /// Breadth-first layering from the root: widest level and index of the last level.
    pub fn width_and_depth(nodes: &NodeArena, root: Option<NodeId>) -> (usize, i32) {
        let mut max_width = 0;
        let mut max_depth = -1;

        let Some(root) = root.filter(|r| nodes.contains(*r)) else {
            return (max_width, max_depth);
        };

        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut level = vec![root];
        while !level.is_empty() {
            max_depth += 1;
            max_width = max_width.max(level.len());
            visited.extend(level.iter().copied());

            let mut next_level = Vec::new();
            for &id in &level {
                for &next in nodes.neighbors_of(id) {
                    if !visited.contains(&next) && !next_level.contains(&next) {
                        next_level.push(next);
                    }
                }
            }
            level = next_level;
        }

        (max_width, max_depth)
    }

    /// Direct neighbors of the root.
    pub fn main_ideas(nodes: &NodeArena, root: Option<NodeId>) -> &[NodeId] {
        root.map(|r| nodes.neighbors_of(r)).unwrap_or(&[])
    }

    /// Largest number of details hanging off a single main idea.
    ///
    /// Details of `m` are the nodes reachable from `m` without stepping onto
    /// the root, excluding `m`. Zero when the root has no main ideas.
    pub fn max_num_details(nodes: &NodeArena, root: Option<NodeId>) -> usize {
        let Some(root) = root else {
            return 0;
        };

        Self::main_ideas(nodes, Some(root))
            .iter()
            .map(|&idea| Self::subtree_size(nodes, idea, root) - 1)
            .max()
            .unwrap_or(0)
    }

    fn subtree_size(nodes: &NodeArena, idea: NodeId, root: NodeId) -> usize {
        let mut details: HashSet<NodeId> = HashSet::from([idea]);
        let mut considering = vec![idea];
        while let Some(id) = considering.pop() {
            for &next in nodes.neighbors_of(id) {
                if next != root && details.insert(next) {
                    considering.push(next);
                }
            }
        }
        details.len()
    }

    /// Longest hop distance spanned by any crosslink, or 0 without crosslinks.
    pub fn max_crosslink_distance(
        nodes: &NodeArena,
        crosslinks: &[Crosslink],
    ) -> Result<usize, GraphError> {
        crosslinks.iter().try_fold(0, |max, link| {
            Ok(max.max(nodes.hop_distance(link.a, link.b)?))
        })
    }

    /// Undirected edge count: half the sum of neighbor-set sizes.
    pub fn edge_count(nodes: &NodeArena, ids: &[NodeId]) -> usize {
        ids.iter()
            .map(|&id| nodes.neighbors_of(id).len())
            .sum::<usize>()
            / 2
    }
}
