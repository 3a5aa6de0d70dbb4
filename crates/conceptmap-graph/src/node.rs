use conceptmap_core::{GraphError, NodeId, Point};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

/// One idea on the concept map.
///
/// Neighbors are ids into the owning [`NodeArena`]; a node never owns
/// another node. Membership is kept symmetric by the arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapNode {
    pub id: NodeId,
    pub position: Point,
    neighbors: Vec<NodeId>,
}

impl MapNode {
    pub fn new(id: NodeId, position: Point) -> Self {
        Self {
            id,
            position,
            neighbors: Vec::new(),
        }
    }

    pub fn neighbors(&self) -> &[NodeId] {
        &self.neighbors
    }

    pub fn has_neighbor(&self, id: NodeId) -> bool {
        self.neighbors.contains(&id)
    }

    /// Euclidean distance from this node's position to `point`.
    pub fn distance_to(&self, point: Point) -> f32 {
        self.position.distance(point)
    }
}

impl fmt::Display for MapNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node #{}:", self.id)?;
        for neighbor in &self.neighbors {
            write!(f, " {neighbor}")?;
        }
        Ok(())
    }
}

/// Id-indexed storage for every node of a graph.
#[derive(Debug, Clone, Default)]
pub struct NodeArena {
    nodes: HashMap<NodeId, MapNode>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: MapNode) {
        self.nodes.insert(node.id, node);
    }

    pub fn get(&self, id: NodeId) -> Option<&MapNode> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn require(&self, id: NodeId) -> Result<&MapNode, GraphError> {
        self.nodes.get(&id).ok_or(GraphError::UnknownNode(id))
    }

    /// Add the symmetric edge `a <-> b`. Callers check for duplicates first.
    pub(crate) fn connect(&mut self, a: NodeId, b: NodeId) -> Result<(), GraphError> {
        self.require(a)?;
        self.require(b)?;
        if let Some(node) = self.nodes.get_mut(&a) {
            node.neighbors.push(b);
        }
        if let Some(node) = self.nodes.get_mut(&b) {
            node.neighbors.push(a);
        }
        Ok(())
    }

    /// Remove `id` from the arena and from every other node's neighbor list.
    pub(crate) fn remove(&mut self, id: NodeId) -> Option<MapNode> {
        let removed = self.nodes.remove(&id)?;
        for node in self.nodes.values_mut() {
            node.neighbors.retain(|&n| n != id);
        }
        Some(removed)
    }

    /// Every node reachable from `start`, in breadth-first (level) order.
    ///
    /// Each node appears exactly once. Unknown `start` yields an empty list.
    pub fn whole_graph(&self, start: NodeId) -> Vec<NodeId> {
        if !self.contains(start) {
            return Vec::new();
        }

        let mut all = vec![start];
        let mut seen: HashSet<NodeId> = HashSet::from([start]);
        let mut level = vec![start];
        while !level.is_empty() {
            let mut next_level = Vec::new();
            for id in &level {
                for &next in self.neighbors_of(*id) {
                    if seen.insert(next) {
                        next_level.push(next);
                    }
                }
            }
            all.extend_from_slice(&next_level);
            level = next_level;
        }
        all
    }

    /// Minimum hop count from `from` to `to` over neighbor links.
    pub fn hop_distance(&self, from: NodeId, to: NodeId) -> Result<usize, GraphError> {
        self.require(from)?;
        self.require(to)?;
        if from == to {
            return Ok(0);
        }

        let mut visited: HashSet<NodeId> = HashSet::from([from]);
        let mut queue: VecDeque<(NodeId, usize)> = VecDeque::from([(from, 0)]);
        while let Some((id, hops)) = queue.pop_front() {
            for &next in self.neighbors_of(id) {
                if next == to {
                    return Ok(hops + 1);
                }
                if visited.insert(next) {
                    queue.push_back((next, hops + 1));
                }
            }
        }

        Err(GraphError::NotConnected { from, to })
    }

    pub(crate) fn neighbors_of(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(&id)
            .map(|node| node.neighbors.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena_with(ids: &[i64]) -> NodeArena {
        let mut arena = NodeArena::new();
        for &id in ids {
            arena.insert(MapNode::new(NodeId(id), Point::new(id as f32 * 10.0, 0.0)));
        }
        arena
    }

    #[test]
    fn test_connect_is_symmetric() {
        let mut arena = arena_with(&[1, 2]);
        arena.connect(NodeId(1), NodeId(2)).unwrap();

        assert!(arena.get(NodeId(1)).unwrap().has_neighbor(NodeId(2)));
        assert!(arena.get(NodeId(2)).unwrap().has_neighbor(NodeId(1)));
    }

    #[test]
    fn test_connect_unknown_node_fails() {
        let mut arena = arena_with(&[1]);
        assert_eq!(
            arena.connect(NodeId(1), NodeId(9)),
            Err(GraphError::UnknownNode(NodeId(9)))
        );
        assert!(arena.get(NodeId(1)).unwrap().neighbors().is_empty());
    }

    #[test]
    fn test_whole_graph_visits_each_node_once() {
        // 1 - 2 - 4
        //  \ /
        //   3
        let mut arena = arena_with(&[1, 2, 3, 4, 5]);
        arena.connect(NodeId(1), NodeId(2)).unwrap();
        arena.connect(NodeId(1), NodeId(3)).unwrap();
        arena.connect(NodeId(2), NodeId(3)).unwrap();
        arena.connect(NodeId(2), NodeId(4)).unwrap();

        let all = arena.whole_graph(NodeId(1));
        assert_eq!(all, vec![NodeId(1), NodeId(2), NodeId(3), NodeId(4)]);
        assert!(arena.whole_graph(NodeId(42)).is_empty());
        assert_eq!(arena.whole_graph(NodeId(5)), vec![NodeId(5)]);
    }

    #[test]
    fn test_hop_distance() {
        let mut arena = arena_with(&[1, 2, 3, 4, 5]);
        arena.connect(NodeId(1), NodeId(2)).unwrap();
        arena.connect(NodeId(2), NodeId(3)).unwrap();
        arena.connect(NodeId(3), NodeId(4)).unwrap();
        arena.connect(NodeId(1), NodeId(4)).unwrap();

        assert_eq!(arena.hop_distance(NodeId(1), NodeId(1)), Ok(0));
        assert_eq!(arena.hop_distance(NodeId(1), NodeId(3)), Ok(2));
        assert_eq!(arena.hop_distance(NodeId(2), NodeId(4)), Ok(2));
        assert_eq!(arena.hop_distance(NodeId(4), NodeId(1)), Ok(1));
        assert_eq!(
            arena.hop_distance(NodeId(1), NodeId(5)),
            Err(GraphError::NotConnected {
                from: NodeId(1),
                to: NodeId(5)
            })
        );
        assert_eq!(
            arena.hop_distance(NodeId(1), NodeId(77)),
            Err(GraphError::UnknownNode(NodeId(77)))
        );
    }

    #[test]
    fn test_remove_detaches_from_neighbors() {
        let mut arena = arena_with(&[1, 2, 3]);
        arena.connect(NodeId(1), NodeId(2)).unwrap();
        arena.connect(NodeId(2), NodeId(3)).unwrap();

        let removed = arena.remove(NodeId(2)).unwrap();
        assert_eq!(removed.neighbors(), &[NodeId(1), NodeId(3)]);
        assert!(arena.get(NodeId(1)).unwrap().neighbors().is_empty());
        assert!(arena.get(NodeId(3)).unwrap().neighbors().is_empty());
        assert!(arena.remove(NodeId(2)).is_none());
    }

    #[test]
    fn test_distance_to_point_and_display() {
        let mut arena = arena_with(&[1, 2]);
        arena.connect(NodeId(1), NodeId(2)).unwrap();
        let node = arena.get(NodeId(1)).unwrap();

        assert_eq!(node.distance_to(Point::new(10.0, 0.0)), 0.0);
        assert_eq!(node.distance_to(Point::new(13.0, 4.0)), 5.0);
        assert_eq!(node.to_string(), "Node #1: 2");
    }
}
