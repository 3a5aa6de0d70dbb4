use serde::{Deserialize, Serialize};
use std::fmt;

pub mod error;
pub mod metrics;

pub use error::GraphError;
pub use metrics::GraphMetrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub i64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out sequential node ids for a single graph model.
///
/// Ids keep counting across graph resets so a stale id from a previous
/// image can never alias a node of the current one.
#[derive(Debug, Clone, Default)]
pub struct NodeIdAllocator {
    next: i64,
}

impl NodeIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start issuing ids from `first` (useful when embedding several models).
    pub fn starting_at(first: i64) -> Self {
        Self { next: first }
    }

    pub fn allocate(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }

    /// The id the next call to `allocate` will return.
    pub fn peek(&self) -> NodeId {
        NodeId(self.next)
    }
}

/// A position on the annotation canvas, in canvas pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Unordered node pair flagged as a crosslink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Crosslink {
    pub a: NodeId,
    pub b: NodeId,
}

impl Crosslink {
    pub fn new(a: NodeId, b: NodeId) -> Self {
        Self { a, b }
    }

    /// True when this crosslink joins `x` and `y`, in either orientation.
    pub fn joins(&self, x: NodeId, y: NodeId) -> bool {
        (self.a == x && self.b == y) || (self.a == y && self.b == x)
    }

    pub fn touches(&self, id: NodeId) -> bool {
        self.a == id || self.b == id
    }
}
