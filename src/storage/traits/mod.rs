//! Storage backend traits.

mod graph;

pub use graph::{BATCH_CHUNK_SIZE, GraphBackend};
