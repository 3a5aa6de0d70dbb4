use crate::graph::GraphModel;
use conceptmap_core::{NodeId, Point};

/// Radius of a drawn node, in canvas pixels.
pub const DEFAULT_HIT_RADIUS: f32 = 40.0;

/// Resolves canvas clicks to graph nodes.
///
/// A click hits a node when it lands within `radius` of the node's
/// position. When circles overlap, the node closest to the root in
/// breadth-first order wins.
#[derive(Debug, Clone, Copy)]
pub struct HitTester {
    radius: f32,
}

impl Default for HitTester {
    fn default() -> Self {
        Self::new()
    }
}

impl HitTester {
    pub fn new() -> Self {
        Self::with_radius(DEFAULT_HIT_RADIUS)
    }

    pub fn with_radius(radius: f32) -> Self {
        Self { radius }
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn set_radius(&mut self, radius: f32) {
        self.radius = radius;
    }

    pub fn hit_test(&self, model: &GraphModel, pos: Point) -> Option<NodeId> {
        model
            .nodes()
            .into_iter()
            .find(|node| node.distance_to(pos) <= self.radius)
            .map(|node| node.id)
    }
}
