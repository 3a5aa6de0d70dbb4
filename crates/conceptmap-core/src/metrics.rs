use serde::{Deserialize, Serialize};

/// Snapshot of every derived graph metric, recomputed after each mutation.
///
/// `depth` is signed: a layering that never ran reports `-1`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphMetrics {
    pub num_nodes: usize,
    pub num_edges: usize,
    pub width: usize,
    pub depth: i32,
    pub num_main_ideas: usize,
    pub max_num_details: usize,
    pub num_crosslinks: usize,
    pub max_crosslink_dist: usize,
}

impl GraphMetrics {
    /// Width plus depth.
    pub fn hss(&self) -> i32 {
        self.width as i32 + self.depth
    }
}
