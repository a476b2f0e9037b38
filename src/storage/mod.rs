//! Storage layer.
//!
//! - [`traits`]: the [`GraphBackend`] contract
//! - [`graph`]: relational, native graph and in-memory implementations
//! - [`migrations`]: embedded schema migrations for the relational backend

// Allow cast precision loss for cost and count conversions where exact precision is not critical.
#![allow(clippy::cast_precision_loss)]
// Allow significant_drop_tightening - dropping pooled clients slightly early
// provides no meaningful benefit.
#![allow(clippy::significant_drop_tightening)]
// Allow match_same_arms for explicit type mapping tables.
#![allow(clippy::match_same_arms)]

pub mod graph;
#[cfg(feature = "postgres")]
pub mod migrations;
pub mod traits;

#[cfg(feature = "memgraph")]
pub use graph::{MemgraphGraphBackend, MemgraphGraphConfig};
#[cfg(feature = "postgres")]
pub use graph::{PostgresGraphBackend, PostgresGraphConfig};
pub use graph::InMemoryGraphBackend;
pub use traits::{BATCH_CHUNK_SIZE, GraphBackend};
