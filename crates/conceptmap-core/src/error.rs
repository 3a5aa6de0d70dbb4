use crate::NodeId;
use thiserror::Error;

/// Failures raised by graph mutations and graph queries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// The operation is not allowed in the model's current state.
    #[error("Invalid state: {0}")]
    InvalidState(String),
    /// Neighbor sets of `a` and `b` disagree about their edge.
    #[error("Corrupt graph: neighbor sets of nodes {a} and {b} are not symmetric")]
    CorruptGraph { a: NodeId, b: NodeId },
    #[error("Node {to} is not reachable from node {from}")]
    NotConnected { from: NodeId, to: NodeId },
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),
}
