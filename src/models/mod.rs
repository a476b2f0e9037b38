//! Data models shared by all graph backends.

pub mod graph;

pub use graph::{
    Direction, Edge, EdgeId, EdgeSpec, GraphStats, Node, NodeId, NodeSpec, Path, Properties,
    QueryRow, Subgraph, TraversalParams,
};
