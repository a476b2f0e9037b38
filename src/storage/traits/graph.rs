//! Graph backend trait.
//!
//! One node/edge/traversal contract satisfied identically by structurally
//! different engines.
//!
//! # Available Implementations
//!
//! | Backend | Use Case | Traversal |
//! |---------|----------|-----------|
//! | `PostgresGraphBackend` | Relational store | Recursive CTEs with path arrays |
//! | `MemgraphGraphBackend` | Native graph store over Bolt | Variable-length patterns |
//! | `InMemoryGraphBackend` | Testing, local development | Breadth-first search |
//!
//! # Error Modes and Guarantees
//!
//! All backends return `Result<T>` with errors propagated via [`crate::Error`].
//!
//! | Condition | Error |
//! |-----------|-------|
//! | Called before `connect()` | [`crate::Error::NotConnected`] |
//! | Malformed input | [`crate::Error::InvalidInput`], raised before any I/O |
//! | Update of a missing or deleted entity | [`crate::Error::NotFound`] |
//! | Edge endpoint missing or deleted | [`crate::Error::NotFound`] |
//! | Driver or store failure | [`crate::Error::OperationFailed`] |
//!
//! Deleting a missing entity is not an error: `delete_node` and `delete_edge`
//! return `false`.
//!
//! ## Soft Delete
//!
//! Soft-deleted nodes and edges are excluded from every read, traversal and
//! count. Soft-deleting a node also soft-deletes its incident edges; hard
//! deletion removes the node and detaches all of its edges.
//!
//! ## Batches
//!
//! Batch creation validates every spec of the whole batch before touching the
//! store, then persists in chunks of [`BATCH_CHUNK_SIZE`]. Each chunk is
//! all-or-nothing; chunks committed before a failing chunk stay committed.
//!
//! # Example
//!
//! ```rust,ignore
//! use intelgraph::{GraphBackend, TraversalParams, Direction};
//!
//! let reachable = backend
//!     .traverse(&start, &TraversalParams::new(3)?.with_direction(Direction::Both))
//!     .await?;
//! for node in reachable {
//!     println!("{} at depth {:?}", node.id, node.depth);
//! }
//! ```

use crate::Result;
use crate::models::graph::{
    Direction, Edge, EdgeId, EdgeSpec, GraphStats, Node, NodeId, NodeSpec, Path, Properties,
    QueryRow, Subgraph, TraversalParams,
};
use async_trait::async_trait;

/// Maximum number of specs persisted per batch round trip.
pub const BATCH_CHUNK_SIZE: usize = 1000;

/// Trait for graph backends.
///
/// # Implementor Notes
///
/// - Methods use `&self` so a single instance can be shared via `Arc<dyn GraphBackend>`
/// - The only mutable state is the connection handle; never hold its lock across an `.await`
/// - Validate input before acquiring a connection
/// - Traversal must never revisit a node already on the current path
#[async_trait]
pub trait GraphBackend: Send + Sync {
    // ========================================================================
    // Connection Lifecycle
    // ========================================================================

    /// Establishes pooled access to the store.
    ///
    /// Connecting an already connected backend is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Connection`] if the store cannot be reached.
    async fn connect(&self) -> Result<()>;

    /// Releases the connection handle. Safe to call when never connected.
    async fn disconnect(&self) -> Result<()>;

    /// Returns true if the backend holds a live handle.
    fn is_connected(&self) -> bool;

    /// Static backend name used in logs, metrics and errors.
    fn backend_name(&self) -> &'static str;

    // ========================================================================
    // Node CRUD
    // ========================================================================

    /// Creates a node.
    ///
    /// # Arguments
    ///
    /// * `labels` - Ordered labels; the first is the primary type
    /// * `properties` - Initial properties (reserved names are rejected)
    /// * `id` - Explicit identifier, generated when `None`
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidInput`] if `labels` is empty.
    async fn create_node(
        &self,
        labels: &[String],
        properties: Properties,
        id: Option<NodeId>,
    ) -> Result<Node>;

    /// Retrieves a live node by ID.
    async fn get_node(&self, id: &NodeId) -> Result<Option<Node>>;

    /// Updates node properties.
    ///
    /// With `merge = true` the given properties are unioned over the existing
    /// ones; otherwise they replace them.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if the node is missing or deleted.
    async fn update_node(&self, id: &NodeId, properties: Properties, merge: bool)
    -> Result<Node>;

    /// Deletes a node.
    ///
    /// Returns `true` if a live node was deleted, `false` if there was
    /// nothing to delete.
    async fn delete_node(&self, id: &NodeId, soft: bool) -> Result<bool>;

    // ========================================================================
    // Edge CRUD
    // ========================================================================

    /// Creates an edge between two live nodes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if either endpoint is missing or deleted.
    async fn create_edge(&self, spec: EdgeSpec) -> Result<Edge>;

    /// Retrieves a live edge by ID.
    async fn get_edge(&self, id: &EdgeId) -> Result<Option<Edge>>;

    /// Updates edge properties (same merge semantics as [`Self::update_node`]).
    async fn update_edge(&self, id: &EdgeId, properties: Properties, merge: bool)
    -> Result<Edge>;

    /// Deletes an edge, returning whether a live edge was deleted.
    async fn delete_edge(&self, id: &EdgeId, soft: bool) -> Result<bool>;

    // ========================================================================
    // Batch Mutation
    // ========================================================================

    /// Creates many nodes, returning them in input order.
    async fn batch_create_nodes(&self, specs: Vec<NodeSpec>) -> Result<Vec<Node>>;

    /// Creates many edges, returning them in input order.
    async fn batch_create_edges(&self, specs: Vec<EdgeSpec>) -> Result<Vec<Edge>>;

    // ========================================================================
    // Traversal and Path Finding
    // ========================================================================

    /// Returns nodes reachable from `start_id` within `params.max_depth` hops.
    ///
    /// The start node is excluded. Each node appears once, annotated with the
    /// minimum hop count at which it was reached and one minimum-depth path.
    /// Results are ordered by depth, then id; `limit` is applied last.
    async fn traverse(&self, start_id: &NodeId, params: &TraversalParams) -> Result<Vec<Node>>;

    /// Finds the path with the fewest edges from `start_id` to `end_id`.
    ///
    /// Ties on edge count are broken by the lowest accumulated
    /// [`Edge::traversal_cost`]. Edges are followed outgoing only.
    async fn find_shortest_path(
        &self,
        start_id: &NodeId,
        end_id: &NodeId,
        max_depth: u32,
        edge_types: Option<&[String]>,
    ) -> Result<Option<Path>>;

    /// Finds up to `limit` distinct simple paths, ordered by length then cost.
    async fn find_all_paths(
        &self,
        start_id: &NodeId,
        end_id: &NodeId,
        max_depth: u32,
        limit: usize,
    ) -> Result<Vec<Path>>;

    /// Returns the live 1-hop neighbors of a node, deduplicated.
    async fn get_neighbors(
        &self,
        id: &NodeId,
        direction: Direction,
        edge_types: Option<&[String]>,
        limit: Option<usize>,
    ) -> Result<Vec<Node>>;

    /// Extracts the requested live nodes and, if asked, the edges among them.
    async fn get_subgraph(&self, node_ids: &[NodeId], include_edges: bool) -> Result<Subgraph>;

    // ========================================================================
    // Query
    // ========================================================================

    /// Finds nodes carrying any of `labels` whose properties match exactly.
    async fn find_nodes(
        &self,
        labels: Option<&[String]>,
        properties: Option<&Properties>,
        limit: Option<usize>,
    ) -> Result<Vec<Node>>;

    /// Finds edges by type and endpoints.
    async fn find_edges(
        &self,
        edge_types: Option<&[String]>,
        source_id: Option<&NodeId>,
        target_id: Option<&NodeId>,
        limit: Option<usize>,
    ) -> Result<Vec<Edge>>;

    /// Runs a native query with `$name` parameters.
    ///
    /// This bypasses cross-backend parity: the query language is the
    /// backend's own.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidInput`] on an empty query.
    async fn execute_query(&self, query: &str, parameters: &Properties) -> Result<Vec<QueryRow>>;

    // ========================================================================
    // Statistics and Maintenance
    // ========================================================================

    /// Counts live nodes carrying any of `labels` (all nodes when `None`).
    async fn count_nodes(&self, labels: Option<&[String]>) -> Result<usize>;

    /// Counts live edges of any of `edge_types` (all edges when `None`).
    async fn count_edges(&self, edge_types: Option<&[String]>) -> Result<usize>;

    /// Returns graph statistics.
    async fn get_stats(&self) -> Result<GraphStats>;

    /// Hard-removes all graph data.
    async fn clear(&self) -> Result<()>;
}
