//! Graph storage backends.
//!
//! This module provides implementations of the [`GraphBackend`] trait plus the
//! validation and bookkeeping they share.
//!
//! # Available Backends
//!
//! | Backend | Feature | Query paradigm |
//! |---------|---------|----------------|
//! | [`PostgresGraphBackend`] | `postgres` | Recursive CTEs over two tables |
//! | [`MemgraphGraphBackend`] | `memgraph` | Cypher over Bolt |
//! | [`InMemoryGraphBackend`] | always | Breadth-first search over hash maps |
//!
//! # Example
//!
//! ```rust,ignore
//! use intelgraph::storage::graph::InMemoryGraphBackend;
//! use intelgraph::GraphBackend;
//!
//! let backend = InMemoryGraphBackend::new();
//! backend.connect().await?;
//! let host = backend.create_node(&["Host".into()], Properties::new(), None).await?;
//! ```

#[cfg(feature = "memgraph")]
pub mod cypher;
#[cfg(feature = "memgraph")]
mod memgraph;
mod memory;
#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "postgres")]
pub mod sql;

#[cfg(feature = "memgraph")]
pub use memgraph::{MemgraphGraphBackend, MemgraphGraphConfig};
pub use memory::InMemoryGraphBackend;
#[cfg(feature = "postgres")]
pub use postgres::{PostgresGraphBackend, PostgresGraphConfig};

// Re-export trait for convenience
pub use crate::storage::traits::{BATCH_CHUNK_SIZE, GraphBackend};

use crate::models::graph::{
    EDGE_RESERVED_KEYS, Edge, EdgeSpec, NODE_RESERVED_KEYS, Node, NodeSpec, Path, Properties,
    validate_labels, validate_limit, validate_max_depth, validate_properties,
};
use crate::{Error, Result};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Acquires a read lock, recovering from poisoning.
pub(crate) fn read_lock<'a, T>(lock: &'a RwLock<T>, backend: &'static str) -> RwLockReadGuard<'a, T> {
    lock.read().unwrap_or_else(|poisoned| {
        tracing::warn!(backend, "Graph backend lock was poisoned, recovering");
        metrics::counter!("graph_lock_poison_recovery_total", "backend" => backend).increment(1);
        poisoned.into_inner()
    })
}

/// Acquires a write lock, recovering from poisoning.
pub(crate) fn write_lock<'a, T>(
    lock: &'a RwLock<T>,
    backend: &'static str,
) -> RwLockWriteGuard<'a, T> {
    lock.write().unwrap_or_else(|poisoned| {
        tracing::warn!(backend, "Graph backend lock was poisoned, recovering");
        metrics::counter!("graph_lock_poison_recovery_total", "backend" => backend).increment(1);
        poisoned.into_inner()
    })
}

/// Slot holding a cloneable connection handle (pool or driver).
///
/// The lock is only held long enough to clone the handle out, so callers can
/// await freely on the clone.
#[derive(Debug)]
pub(crate) struct HandleSlot<T> {
    backend: &'static str,
    inner: RwLock<Option<T>>,
}

impl<T: Clone> HandleSlot<T> {
    pub(crate) const fn new(backend: &'static str) -> Self {
        Self {
            backend,
            inner: RwLock::new(None),
        }
    }

    /// Returns a clone of the handle or [`Error::NotConnected`].
    pub(crate) fn get(&self) -> Result<T> {
        read_lock(&self.inner, self.backend)
            .clone()
            .ok_or(Error::NotConnected {
                backend: self.backend,
            })
    }

    pub(crate) fn is_set(&self) -> bool {
        read_lock(&self.inner, self.backend).is_some()
    }

    pub(crate) fn set(&self, handle: T) {
        *write_lock(&self.inner, self.backend) = Some(handle);
    }

    pub(crate) fn take(&self) -> Option<T> {
        write_lock(&self.inner, self.backend).take()
    }
}

// ============================================================================
// Input validation shared by all backends
// ============================================================================

/// Validates a `create_node` call.
pub(crate) fn validate_new_node(labels: &[String], properties: &Properties) -> Result<()> {
    validate_labels(labels)?;
    validate_properties(properties, NODE_RESERVED_KEYS)
}

/// Validates the property map of a node update.
pub(crate) fn validate_node_update(properties: &Properties) -> Result<()> {
    validate_properties(properties, NODE_RESERVED_KEYS)
}

/// Validates the property map of an edge update.
pub(crate) fn validate_edge_update(properties: &Properties) -> Result<()> {
    validate_properties(properties, EDGE_RESERVED_KEYS)
}

/// Validates path-finding bounds.
pub(crate) fn validate_path_bounds(max_depth: u32, limit: Option<usize>) -> Result<()> {
    validate_max_depth(max_depth)?;
    limit.map_or(Ok(()), validate_limit)
}

/// Validates an optional result limit.
pub(crate) fn validate_optional_limit(limit: Option<usize>) -> Result<()> {
    limit.map_or(Ok(()), validate_limit)
}

/// Rejects empty native queries.
pub(crate) fn validate_query(query: &str) -> Result<()> {
    if query.trim().is_empty() {
        return Err(Error::InvalidInput("query must not be empty".to_string()));
    }
    Ok(())
}

/// Validates a whole node batch and materializes it, assigning missing ids.
pub(crate) fn prepare_node_batch(specs: Vec<NodeSpec>) -> Result<Vec<Node>> {
    for (index, spec) in specs.iter().enumerate() {
        spec.validate()
            .map_err(|e| Error::InvalidInput(format!("node spec {index}: {e}")))?;
    }
    Ok(specs.into_iter().map(NodeSpec::into_node).collect())
}

/// Validates a whole edge batch and materializes it, assigning missing ids.
pub(crate) fn prepare_edge_batch(specs: Vec<EdgeSpec>) -> Result<Vec<Edge>> {
    specs
        .into_iter()
        .enumerate()
        .map(|(index, spec)| {
            spec.into_edge()
                .map_err(|e| Error::InvalidInput(format!("edge spec {index}: {e}")))
        })
        .collect()
}

/// Empty filter lists mean "no filter".
pub(crate) fn non_empty<T>(filter: Option<&[T]>) -> Option<&[T]> {
    filter.filter(|f| !f.is_empty())
}

// ============================================================================
// Result shaping shared by all backends
// ============================================================================

/// Orders traversal results by depth then id, and applies the limit.
pub(crate) fn finish_traversal(mut nodes: Vec<Node>, limit: Option<usize>) -> Vec<Node> {
    nodes.sort_by(|a, b| a.depth.cmp(&b.depth).then_with(|| a.id.cmp(&b.id)));
    if let Some(limit) = limit {
        nodes.truncate(limit);
    }
    nodes
}

/// Orders paths by edge count then accumulated cost.
pub(crate) fn rank_paths(paths: &mut [Path]) {
    paths.sort_by(|a, b| {
        a.length
            .cmp(&b.length)
            .then_with(|| a.total_weight.total_cmp(&b.total_weight))
    });
}

/// Records a creation metric.
pub(crate) fn record_created(backend: &'static str, kind: &'static str, count: usize) {
    let name = match kind {
        "edge" => "graph_edges_created_total",
        _ => "graph_nodes_created_total",
    };
    metrics::counter!(name, "backend" => backend).increment(count as u64);
}

/// Logs a store failure with operation context and converts it.
pub(crate) fn store_error(
    backend: &'static str,
    operation: &str,
    cause: impl std::fmt::Display,
) -> Error {
    tracing::warn!(backend, operation, error = %cause, "Graph operation failed");
    metrics::counter!("graph_operation_errors_total", "backend" => backend).increment(1);
    Error::operation(operation, cause)
}
