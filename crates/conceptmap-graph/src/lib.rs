pub mod graph;
pub mod hit_tester;
pub mod metrics;
pub mod node;

pub use graph::GraphModel;
pub use hit_tester::{DEFAULT_HIT_RADIUS, HitTester};
pub use metrics::MetricsEngine;
pub use node::{MapNode, NodeArena};
