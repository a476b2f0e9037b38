//! # Intelgraph
//!
//! Graph backend abstraction layer for the intelligence store.
//!
//! One node/edge/traversal contract ([`GraphBackend`]) is implemented over two
//! structurally different engines:
//!
//! - **`PostgreSQL`**: entities and relationships in two tables, traversal via
//!   recursive CTEs with array-based cycle prevention
//! - **Memgraph**: native graph entities over Bolt, traversal via
//!   variable-length pattern matching
//!
//! An in-memory backend implements the same contract for tests and local
//! development. Callers pick a backend through [`GraphBackendFactory`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use intelgraph::{BackendType, BackendParams, GraphBackendFactory, TraversalParams};
//!
//! let backend = GraphBackendFactory::create(
//!     BackendType::Memgraph,
//!     BackendParams::new().with_uri("bolt://localhost:7687"),
//! )?;
//! backend.connect().await?;
//!
//! let alice = backend.create_node(&["Person".into()], props, None).await?;
//! let reachable = backend.traverse(&alice.id, &TraversalParams::new(3)?).await?;
//!
//! backend.disconnect().await?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod config;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

// Re-exports for convenience
pub use config::GraphConfig;
pub use models::graph::{
    Direction, Edge, EdgeId, EdgeSpec, GraphStats, Node, NodeId, NodeSpec, Path, Properties,
    QueryRow, Subgraph, TraversalParams,
};
pub use services::{BackendParams, BackendType, GraphBackendFactory};
pub use storage::traits::GraphBackend;

/// Error type for graph operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Empty labels or edge type, out-of-range weight, zero depth/limit, empty query |
/// | `NotConnected` | Any data operation before `connect()` |
/// | `Connection` | `connect()` cannot reach the underlying store |
/// | `NotFound` | Update of a missing or soft-deleted entity, edge endpoint missing |
/// | `MissingParameter` | Factory is missing a required backend parameter |
/// | `OperationFailed` | Driver or database errors |
/// | `FeatureNotEnabled` | Backend compiled out via Cargo features |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    ///
    /// Raised synchronously, before any I/O.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The backend has not been connected (or was disconnected).
    ///
    /// Not fatal to the backend instance: calling `connect()` recovers it.
    #[error("{backend} backend is not connected; call connect() first")]
    NotConnected {
        /// Backend name.
        backend: &'static str,
    },

    /// The underlying store could not be reached.
    #[error("failed to connect {backend} backend: {cause}")]
    Connection {
        /// Backend name.
        backend: &'static str,
        /// The underlying cause.
        cause: String,
    },

    /// A write targeted an entity that does not exist or is soft-deleted.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Entity kind (`node` or `edge`).
        kind: &'static str,
        /// The identifier that failed to resolve.
        id: String,
    },

    /// The factory was asked to build a backend without a required parameter.
    #[error("{backend} backend requires parameter '{parameter}'")]
    MissingParameter {
        /// Backend type name.
        backend: &'static str,
        /// The missing parameter.
        parameter: &'static str,
    },

    /// An operation failed in the underlying store or driver.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// Feature not enabled (requires feature flag).
    #[error("feature not enabled: {0} (compile with --features {0})")]
    FeatureNotEnabled(String),
}

impl Error {
    /// Builds an [`Error::OperationFailed`] from any displayable cause.
    pub fn operation(operation: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::OperationFailed {
            operation: operation.into(),
            cause: cause.to_string(),
        }
    }

    /// Returns true for errors caused by malformed caller input.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }

    /// Returns true if the entity targeted by the call did not resolve.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type alias for graph operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the current Unix timestamp in seconds.
///
/// Uses `SystemTime::now()` with fallback to 0 if the system clock is before
/// the Unix epoch.
#[must_use]
pub fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
