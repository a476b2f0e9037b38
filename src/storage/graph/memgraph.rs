//! Memgraph graph backend.
//!
//! Speaks Cypher over Bolt through `neo4rs`. Nodes carry their labels and
//! properties natively; the backend adds `id`, `created_at`, `updated_at` and
//! `deleted_at` properties (epoch seconds), and edges additionally store
//! `weight` and `confidence` as relationship properties.
//!
//! Bounded traversals and path searches use variable-length patterns
//! (`-[:T*1..N]->`) filtered to simple paths over live entities.

use super::cypher::{
    self, EdgeRecord, NodeRecord, bolt_map, json_to_bolt, optional_string, optional_string_list,
    properties_to_bolt, string_list,
};
use super::{
    BATCH_CHUNK_SIZE, HandleSlot, finish_traversal, non_empty, prepare_edge_batch,
    prepare_node_batch, rank_paths, record_created, store_error, validate_edge_update,
    validate_new_node, validate_node_update, validate_optional_limit, validate_path_bounds,
    validate_query,
};
use crate::models::graph::{
    Direction, Edge, EdgeId, EdgeSpec, GraphStats, Node, NodeId, NodeSpec, Path, Properties,
    QueryRow, Subgraph, TraversalParams,
};
use crate::storage::traits::GraphBackend;
use crate::{Error, Result, current_timestamp};
use async_trait::async_trait;
use neo4rs::{BoltType, ConfigBuilder, Graph, Query, Row, query};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use tracing::instrument;

const BACKEND: &str = "memgraph";

/// Configuration for [`MemgraphGraphBackend`].
pub struct MemgraphGraphConfig {
    /// Bolt URI, e.g. `bolt://localhost:7687`.
    pub uri: Option<String>,
    /// Username (empty when authentication is disabled).
    pub username: String,
    /// Password.
    pub password: Option<SecretString>,
    /// Database name, server default when unset.
    pub database: Option<String>,
    /// Maximum pooled Bolt connections.
    pub max_connections: usize,
    /// Rows fetched per Bolt `PULL`.
    pub fetch_size: usize,
}

impl MemgraphGraphConfig {
    /// Default maximum connections.
    pub const DEFAULT_MAX_CONNECTIONS: usize = 16;
    /// Default fetch size.
    pub const DEFAULT_FETCH_SIZE: usize = 500;

    /// Creates a config for the given Bolt URI.
    #[must_use]
    pub fn with_uri(uri: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            ..Self::default()
        }
    }

    /// Sets the credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: SecretString) -> Self {
        self.username = username.into();
        self.password = Some(password);
        self
    }

    /// Sets the database name.
    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Sets the connection limit.
    #[must_use]
    pub const fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }
}

impl Default for MemgraphGraphConfig {
    fn default() -> Self {
        Self {
            uri: None,
            username: String::new(),
            password: None,
            database: None,
            max_connections: Self::DEFAULT_MAX_CONNECTIONS,
            fetch_size: Self::DEFAULT_FETCH_SIZE,
        }
    }
}

impl fmt::Debug for MemgraphGraphConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemgraphGraphConfig")
            .field("uri", &self.uri)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("database", &self.database)
            .field("max_connections", &self.max_connections)
            .field("fetch_size", &self.fetch_size)
            .finish()
    }
}

/// Memgraph-backed graph over Bolt.
pub struct MemgraphGraphBackend {
    config: MemgraphGraphConfig,
    graph: HandleSlot<Graph>,
}

impl fmt::Debug for MemgraphGraphBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemgraphGraphBackend")
            .field("uri", &self.config.uri)
            .field("connected", &self.graph.is_set())
            .finish_non_exhaustive()
    }
}

impl MemgraphGraphBackend {
    /// Creates a disconnected backend.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingParameter`] when no URI is configured.
    pub fn new(config: MemgraphGraphConfig) -> Result<Self> {
        if config.uri.as_deref().is_none_or(|u| u.trim().is_empty()) {
            return Err(Error::MissingParameter {
                backend: BACKEND,
                parameter: "uri",
            });
        }
        Ok(Self {
            config,
            graph: HandleSlot::new(BACKEND),
        })
    }

    fn driver_config(&self) -> Result<neo4rs::Config> {
        let uri = self.config.uri.as_deref().ok_or(Error::MissingParameter {
            backend: BACKEND,
            parameter: "uri",
        })?;
        let password = self
            .config
            .password
            .as_ref()
            .map(|p| p.expose_secret().to_string())
            .unwrap_or_default();
        let mut builder = ConfigBuilder::default()
            .uri(uri)
            .user(self.config.username.as_str())
            .password(password.as_str())
            .fetch_size(self.config.fetch_size)
            .max_connections(self.config.max_connections);
        if let Some(database) = self.config.database.as_deref() {
            builder = builder.db(database);
        }
        builder.build().map_err(|e| Error::Connection {
            backend: BACKEND,
            cause: e.to_string(),
        })
    }

    /// Runs a query and collects every row.
    async fn fetch(&self, graph: &Graph, q: Query, operation: &str) -> Result<Vec<Row>> {
        let mut stream = graph
            .execute(q)
            .await
            .map_err(|e| store_error(BACKEND, operation, e))?;
        let mut rows = Vec::new();
        while let Some(row) = stream
            .next()
            .await
            .map_err(|e| store_error(BACKEND, operation, e))?
        {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Runs a query that returns a single `deleted` count.
    async fn fetch_deleted(&self, q: Query, operation: &str) -> Result<bool> {
        let graph = self.graph.get()?;
        let rows = self.fetch(&graph, q, operation).await?;
        let deleted = rows
            .first()
            .map(|row| decode::<i64>(row, "deleted", operation))
            .transpose()?
            .unwrap_or(0);
        Ok(deleted > 0)
    }

    async fn fetch_nodes(&self, graph: &Graph, q: Query, operation: &str) -> Result<Vec<Node>> {
        self.fetch(graph, q, operation)
            .await?
            .iter()
            .map(|row| decode::<NodeRecord>(row, "node", operation).map(NodeRecord::into_node))
            .collect()
    }

    async fn fetch_edges(&self, graph: &Graph, q: Query, operation: &str) -> Result<Vec<Edge>> {
        self.fetch(graph, q, operation)
            .await?
            .iter()
            .map(|row| decode::<EdgeRecord>(row, "edge", operation).map(EdgeRecord::into_edge))
            .collect()
    }

    async fn fetch_ids(&self, graph: &Graph, q: Query, operation: &str) -> Result<HashSet<String>> {
        self.fetch(graph, q, operation)
            .await?
            .iter()
            .map(|row| decode::<String>(row, "id", operation))
            .collect()
    }

    async fn fetch_count(&self, q: Query, operation: &str) -> Result<usize> {
        let graph = self.graph.get()?;
        let rows = self.fetch(&graph, q, operation).await?;
        let count = rows
            .first()
            .map(|row| decode::<i64>(row, "count", operation))
            .transpose()?
            .unwrap_or(0);
        Ok(usize::try_from(count).unwrap_or_default())
    }

    async fn grouped_counts(&self, graph: &Graph, cypher: String) -> Result<HashMap<String, usize>> {
        let mut counts = HashMap::new();
        for row in self.fetch(graph, query(&cypher), "get_stats").await? {
            let Some(key) = decode::<Option<String>>(&row, "key", "get_stats")? else {
                continue;
            };
            let count = decode::<i64>(&row, "count", "get_stats")?;
            *counts.entry(key).or_insert(0) += usize::try_from(count).unwrap_or_default();
        }
        Ok(counts)
    }

    // ========================================================================
    // Write helpers (one transaction per chunk)
    // ========================================================================

    async fn insert_node_chunk(&self, graph: &Graph, nodes: &[Node]) -> Result<()> {
        let mut ids = HashSet::with_capacity(nodes.len());
        for node in nodes {
            if !ids.insert(node.id.as_str()) {
                return Err(Error::operation(
                    "create_nodes",
                    format!("duplicate node id '{}' in batch", node.id),
                ));
            }
        }
        let requested: Vec<&str> = ids.into_iter().collect();
        let existing = self
            .fetch_ids(
                graph,
                query(&cypher::existing_node_ids()).param("ids", string_list(&requested)),
                "create_nodes",
            )
            .await?;
        if let Some(id) = existing.iter().next() {
            return Err(store_error(
                BACKEND,
                "create_nodes",
                format!("node '{id}' already exists"),
            ));
        }

        let mut groups: BTreeMap<&[String], Vec<BoltType>> = BTreeMap::new();
        for node in nodes {
            groups.entry(node.labels.as_slice()).or_default().push(bolt_map([
                ("id", BoltType::from(node.id.as_str())),
                ("props", properties_to_bolt(&node.properties)),
            ]));
        }
        let now = now_param();
        let queries: Vec<Query> = groups
            .into_iter()
            .map(|(labels, rows)| {
                query(&cypher::create_nodes(labels))
                    .param("rows", BoltType::List(neo4rs::BoltList { value: rows }))
                    .param("now", now.clone())
            })
            .collect();
        self.run_in_transaction(graph, queries, "create_nodes").await
    }

    async fn insert_edge_chunk(&self, graph: &Graph, edges: &[Edge]) -> Result<()> {
        let mut ids = HashSet::with_capacity(edges.len());
        for edge in edges {
            if !ids.insert(edge.id.as_str()) {
                return Err(Error::operation(
                    "create_edges",
                    format!("duplicate edge id '{}' in batch", edge.id),
                ));
            }
        }
        let requested: Vec<&str> = ids.into_iter().collect();
        let existing = self
            .fetch_ids(
                graph,
                query(&cypher::existing_edge_ids()).param("ids", string_list(&requested)),
                "create_edges",
            )
            .await?;
        if let Some(id) = existing.iter().next() {
            return Err(store_error(
                BACKEND,
                "create_edges",
                format!("edge '{id}' already exists"),
            ));
        }

        let endpoints: Vec<&str> = edges
            .iter()
            .flat_map(|e| [e.source_id.as_str(), e.target_id.as_str()])
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let live = self
            .fetch_ids(
                graph,
                query(&cypher::live_node_ids()).param("ids", string_list(&endpoints)),
                "check_endpoints",
            )
            .await?;
        for edge in edges {
            for endpoint in [&edge.source_id, &edge.target_id] {
                if !live.contains(endpoint.as_str()) {
                    return Err(Error::NotFound {
                        kind: "node",
                        id: endpoint.to_string(),
                    });
                }
            }
        }

        let mut groups: BTreeMap<&str, Vec<BoltType>> = BTreeMap::new();
        for edge in edges {
            groups.entry(edge.edge_type.as_str()).or_default().push(bolt_map([
                ("id", BoltType::from(edge.id.as_str())),
                ("source", BoltType::from(edge.source_id.as_str())),
                ("target", BoltType::from(edge.target_id.as_str())),
                ("weight", BoltType::from(edge.weight)),
                ("confidence", BoltType::from(edge.confidence)),
                ("props", properties_to_bolt(&edge.properties)),
            ]));
        }
        let now = now_param();
        let queries: Vec<Query> = groups
            .into_iter()
            .map(|(edge_type, rows)| {
                query(&cypher::create_edges(edge_type))
                    .param("rows", BoltType::List(neo4rs::BoltList { value: rows }))
                    .param("now", now.clone())
            })
            .collect();
        self.run_in_transaction(graph, queries, "create_edges").await
    }

    async fn run_in_transaction(
        &self,
        graph: &Graph,
        queries: Vec<Query>,
        operation: &str,
    ) -> Result<()> {
        let mut txn = graph
            .start_txn()
            .await
            .map_err(|e| store_error(BACKEND, operation, e))?;
        txn.run_queries(queries)
            .await
            .map_err(|e| store_error(BACKEND, operation, e))?;
        txn.commit()
            .await
            .map_err(|e| store_error(BACKEND, operation, e))
    }

    async fn query_paths(
        &self,
        start_id: &NodeId,
        end_id: &NodeId,
        max_depth: u32,
        edge_types: Option<&[String]>,
        limit: usize,
    ) -> Result<Vec<Path>> {
        let graph = self.graph.get()?;
        let q = query(&cypher::paths(non_empty(edge_types), max_depth))
            .param("start_id", start_id.as_str())
            .param("end_id", end_id.as_str())
            .param("limit", to_bolt_limit(limit));
        let rows = self.fetch(&graph, q, "find_paths").await?;
        let mut paths = rows
            .iter()
            .map(|row| {
                let nodes = decode::<Vec<NodeRecord>>(row, "nodes", "find_paths")?;
                let edges = decode::<Vec<EdgeRecord>>(row, "edges", "find_paths")?;
                Path::new(
                    nodes.into_iter().map(NodeRecord::into_node).collect(),
                    edges.into_iter().map(EdgeRecord::into_edge).collect(),
                )
            })
            .collect::<Result<Vec<_>>>()?;
        rank_paths(&mut paths);
        Ok(paths)
    }
}

#[async_trait]
impl GraphBackend for MemgraphGraphBackend {
    #[instrument(skip(self), fields(backend = BACKEND))]
    async fn connect(&self) -> Result<()> {
        if self.graph.is_set() {
            return Ok(());
        }
        let graph = Graph::connect(self.driver_config()?)
            .await
            .map_err(|e| Error::Connection {
                backend: BACKEND,
                cause: e.to_string(),
            })?;
        graph
            .run(query("RETURN 1"))
            .await
            .map_err(|e| Error::Connection {
                backend: BACKEND,
                cause: e.to_string(),
            })?;
        self.graph.set(graph);
        tracing::info!(uri = ?self.config.uri, "Connected to Memgraph");
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        if self.graph.take().is_some() {
            tracing::debug!(backend = BACKEND, "Disconnected");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.graph.is_set()
    }

    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    #[instrument(skip(self, properties), fields(backend = BACKEND))]
    async fn create_node(
        &self,
        labels: &[String],
        properties: Properties,
        id: Option<NodeId>,
    ) -> Result<Node> {
        validate_new_node(labels, &properties)?;
        let graph = self.graph.get()?;
        let node = Node::new(
            id.unwrap_or_else(NodeId::generate),
            labels.to_vec(),
            properties,
        );
        self.insert_node_chunk(&graph, std::slice::from_ref(&node))
            .await?;
        record_created(BACKEND, "node", 1);
        Ok(node)
    }

    async fn get_node(&self, id: &NodeId) -> Result<Option<Node>> {
        let graph = self.graph.get()?;
        let q = query(&cypher::get_node()).param("id", id.as_str());
        Ok(self.fetch_nodes(&graph, q, "get_node").await?.into_iter().next())
    }

    #[instrument(skip(self, properties), fields(backend = BACKEND))]
    async fn update_node(
        &self,
        id: &NodeId,
        properties: Properties,
        merge: bool,
    ) -> Result<Node> {
        validate_node_update(&properties)?;
        let graph = self.graph.get()?;
        let q = query(&cypher::update_node(merge))
            .param("id", id.as_str())
            .param("props", properties_to_bolt(&properties))
            .param("now", now_param());
        self.fetch_nodes(&graph, q, "update_node")
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound {
                kind: "node",
                id: id.to_string(),
            })
    }

    #[instrument(skip(self), fields(backend = BACKEND))]
    async fn delete_node(&self, id: &NodeId, soft: bool) -> Result<bool> {
        let q = if soft {
            query(&cypher::soft_delete_node())
                .param("id", id.as_str())
                .param("now", now_param())
        } else {
            query(&cypher::hard_delete_node()).param("id", id.as_str())
        };
        self.fetch_deleted(q, "delete_node").await
    }

    #[instrument(skip(self, spec), fields(backend = BACKEND))]
    async fn create_edge(&self, spec: EdgeSpec) -> Result<Edge> {
        let edge = spec.into_edge()?;
        let graph = self.graph.get()?;
        self.insert_edge_chunk(&graph, std::slice::from_ref(&edge))
            .await?;
        record_created(BACKEND, "edge", 1);
        Ok(edge)
    }

    async fn get_edge(&self, id: &EdgeId) -> Result<Option<Edge>> {
        let graph = self.graph.get()?;
        let q = query(&cypher::get_edge()).param("id", id.as_str());
        Ok(self.fetch_edges(&graph, q, "get_edge").await?.into_iter().next())
    }

    #[instrument(skip(self, properties), fields(backend = BACKEND))]
    async fn update_edge(
        &self,
        id: &EdgeId,
        properties: Properties,
        merge: bool,
    ) -> Result<Edge> {
        validate_edge_update(&properties)?;
        let graph = self.graph.get()?;
        let q = query(&cypher::update_edge(merge))
            .param("id", id.as_str())
            .param("props", properties_to_bolt(&properties))
            .param("now", now_param());
        self.fetch_edges(&graph, q, "update_edge")
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound {
                kind: "edge",
                id: id.to_string(),
            })
    }

    #[instrument(skip(self), fields(backend = BACKEND))]
    async fn delete_edge(&self, id: &EdgeId, soft: bool) -> Result<bool> {
        let q = if soft {
            query(&cypher::soft_delete_edge())
                .param("id", id.as_str())
                .param("now", now_param())
        } else {
            query(&cypher::hard_delete_edge()).param("id", id.as_str())
        };
        self.fetch_deleted(q, "delete_edge").await
    }

    #[instrument(skip(self, specs), fields(backend = BACKEND, count = specs.len()))]
    async fn batch_create_nodes(&self, specs: Vec<NodeSpec>) -> Result<Vec<Node>> {
        if specs.is_empty() {
            return Ok(Vec::new());
        }
        let nodes = prepare_node_batch(specs)?;
        let graph = self.graph.get()?;
        for (index, chunk) in nodes.chunks(BATCH_CHUNK_SIZE).enumerate() {
            self.insert_node_chunk(&graph, chunk).await?;
            record_created(BACKEND, "node", chunk.len());
            tracing::debug!(chunk = index, size = chunk.len(), "Committed node chunk");
        }
        Ok(nodes)
    }

    #[instrument(skip(self, specs), fields(backend = BACKEND, count = specs.len()))]
    async fn batch_create_edges(&self, specs: Vec<EdgeSpec>) -> Result<Vec<Edge>> {
        if specs.is_empty() {
            return Ok(Vec::new());
        }
        let edges = prepare_edge_batch(specs)?;
        let graph = self.graph.get()?;
        for (index, chunk) in edges.chunks(BATCH_CHUNK_SIZE).enumerate() {
            self.insert_edge_chunk(&graph, chunk).await?;
            record_created(BACKEND, "edge", chunk.len());
            tracing::debug!(chunk = index, size = chunk.len(), "Committed edge chunk");
        }
        Ok(edges)
    }

    #[instrument(skip(self, params), fields(backend = BACKEND, max_depth = params.max_depth))]
    async fn traverse(&self, start_id: &NodeId, params: &TraversalParams) -> Result<Vec<Node>> {
        params.validate()?;
        let graph = self.graph.get()?;
        let cypher = cypher::traverse(
            params.direction,
            params.edge_type_filter(),
            params.max_depth,
            params.limit.is_some(),
        );
        let mut q = query(&cypher)
            .param("start_id", start_id.as_str())
            .param("labels", optional_string_list(params.node_label_filter()));
        if let Some(limit) = params.limit {
            q = q.param("limit", to_bolt_limit(limit));
        }
        let rows = self.fetch(&graph, q, "traverse").await?;
        let nodes = rows
            .iter()
            .map(|row| {
                let node = decode::<NodeRecord>(row, "node", "traverse")?.into_node();
                let depth = decode::<i64>(row, "depth", "traverse")?;
                let path = decode::<Vec<String>>(row, "path", "traverse")?;
                Ok(node.with_traversal(
                    u32::try_from(depth).unwrap_or_default(),
                    path.into_iter().map(NodeId::from).collect(),
                ))
            })
            .collect::<Result<Vec<_>>>()?;
        metrics::counter!("graph_traversals_total", "backend" => BACKEND).increment(1);
        Ok(finish_traversal(nodes, params.limit))
    }

    #[instrument(skip(self, edge_types), fields(backend = BACKEND))]
    async fn find_shortest_path(
        &self,
        start_id: &NodeId,
        end_id: &NodeId,
        max_depth: u32,
        edge_types: Option<&[String]>,
    ) -> Result<Option<Path>> {
        validate_path_bounds(max_depth, None)?;
        if start_id == end_id {
            return Ok(self.get_node(start_id).await?.map(Path::single));
        }
        let paths = self
            .query_paths(start_id, end_id, max_depth, edge_types, 1)
            .await?;
        Ok(paths.into_iter().next())
    }

    #[instrument(skip(self), fields(backend = BACKEND))]
    async fn find_all_paths(
        &self,
        start_id: &NodeId,
        end_id: &NodeId,
        max_depth: u32,
        limit: usize,
    ) -> Result<Vec<Path>> {
        validate_path_bounds(max_depth, Some(limit))?;
        if start_id == end_id {
            return Ok(self
                .get_node(start_id)
                .await?
                .map(Path::single)
                .into_iter()
                .collect());
        }
        self.query_paths(start_id, end_id, max_depth, None, limit)
            .await
    }

    #[instrument(skip(self, edge_types), fields(backend = BACKEND))]
    async fn get_neighbors(
        &self,
        id: &NodeId,
        direction: Direction,
        edge_types: Option<&[String]>,
        limit: Option<usize>,
    ) -> Result<Vec<Node>> {
        validate_optional_limit(limit)?;
        let graph = self.graph.get()?;
        let cypher = cypher::neighbors(direction, non_empty(edge_types), limit.is_some());
        let mut q = query(&cypher).param("id", id.as_str());
        if let Some(limit) = limit {
            q = q.param("limit", to_bolt_limit(limit));
        }
        self.fetch_nodes(&graph, q, "get_neighbors").await
    }

    async fn get_subgraph(&self, node_ids: &[NodeId], include_edges: bool) -> Result<Subgraph> {
        let graph = self.graph.get()?;
        let mut seen = HashSet::new();
        let requested: Vec<&str> = node_ids
            .iter()
            .filter(|id| seen.insert(*id))
            .map(NodeId::as_str)
            .collect();

        let q = query(&cypher::nodes_by_ids()).param("ids", string_list(&requested));
        let mut found: HashMap<String, Node> = self
            .fetch_nodes(&graph, q, "get_subgraph")
            .await?
            .into_iter()
            .map(|n| (n.id.to_string(), n))
            .collect();
        let nodes: Vec<Node> = requested.iter().filter_map(|id| found.remove(*id)).collect();

        let edges = if include_edges && !nodes.is_empty() {
            let members: Vec<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
            let q = query(&cypher::edges_among()).param("ids", string_list(&members));
            self.fetch_edges(&graph, q, "get_subgraph").await?
        } else {
            Vec::new()
        };
        Ok(Subgraph { nodes, edges })
    }

    async fn find_nodes(
        &self,
        labels: Option<&[String]>,
        properties: Option<&Properties>,
        limit: Option<usize>,
    ) -> Result<Vec<Node>> {
        validate_optional_limit(limit)?;
        let graph = self.graph.get()?;
        let filters: Vec<(&String, &serde_json::Value)> =
            properties.map(|p| p.iter().collect()).unwrap_or_default();
        let keys: Vec<&str> = filters.iter().map(|(k, _)| k.as_str()).collect();
        let cypher = cypher::find_nodes(&keys, limit.is_some());
        let mut q = query(&cypher).param("labels", optional_string_list(non_empty(labels)));
        for (index, (_, value)) in filters.iter().enumerate() {
            q = q.param(&format!("filter_{index}"), json_to_bolt(value));
        }
        if let Some(limit) = limit {
            q = q.param("limit", to_bolt_limit(limit));
        }
        self.fetch_nodes(&graph, q, "find_nodes").await
    }

    async fn find_edges(
        &self,
        edge_types: Option<&[String]>,
        source_id: Option<&NodeId>,
        target_id: Option<&NodeId>,
        limit: Option<usize>,
    ) -> Result<Vec<Edge>> {
        validate_optional_limit(limit)?;
        let graph = self.graph.get()?;
        let cypher = cypher::find_edges(limit.is_some());
        let mut q = query(&cypher)
            .param("types", optional_string_list(non_empty(edge_types)))
            .param("source", optional_string(source_id.map(NodeId::as_str)))
            .param("target", optional_string(target_id.map(NodeId::as_str)));
        if let Some(limit) = limit {
            q = q.param("limit", to_bolt_limit(limit));
        }
        self.fetch_edges(&graph, q, "find_edges").await
    }

    #[instrument(skip(self, parameters), fields(backend = BACKEND))]
    async fn execute_query(&self, cypher: &str, parameters: &Properties) -> Result<Vec<QueryRow>> {
        validate_query(cypher)?;
        let graph = self.graph.get()?;
        let q = parameters
            .iter()
            .fold(query(cypher), |q, (name, value)| {
                q.param(name, json_to_bolt(value))
            });
        self.fetch(&graph, q, "execute_query")
            .await?
            .iter()
            .map(|row| {
                row.to::<QueryRow>()
                    .map_err(|e| store_error(BACKEND, "execute_query", e))
            })
            .collect()
    }

    async fn count_nodes(&self, labels: Option<&[String]>) -> Result<usize> {
        let q = query(&cypher::count_nodes())
            .param("labels", optional_string_list(non_empty(labels)));
        self.fetch_count(q, "count_nodes").await
    }

    async fn count_edges(&self, edge_types: Option<&[String]>) -> Result<usize> {
        let q = query(&cypher::count_edges())
            .param("types", optional_string_list(non_empty(edge_types)));
        self.fetch_count(q, "count_edges").await
    }

    async fn get_stats(&self) -> Result<GraphStats> {
        let graph = self.graph.get()?;
        let nodes_by_label = self.grouped_counts(&graph, cypher::nodes_by_label()).await?;
        let edges_by_type = self.grouped_counts(&graph, cypher::edges_by_type()).await?;
        Ok(GraphStats {
            node_count: nodes_by_label.values().sum(),
            edge_count: edges_by_type.values().sum(),
            nodes_by_label,
            edges_by_type,
        })
    }

    async fn clear(&self) -> Result<()> {
        let graph = self.graph.get()?;
        graph
            .run(query(&cypher::clear()))
            .await
            .map_err(|e| store_error(BACKEND, "clear", e))?;
        tracing::info!(backend = BACKEND, "Cleared graph data");
        Ok(())
    }
}

/// Decodes one column of a row.
fn decode<T: DeserializeOwned>(row: &Row, key: &str, operation: &str) -> Result<T> {
    row.get::<T>(key)
        .map_err(|e| store_error(BACKEND, operation, format!("column '{key}': {e}")))
}

fn now_param() -> BoltType {
    BoltType::from(i64::try_from(current_timestamp()).unwrap_or(i64::MAX))
}

fn to_bolt_limit(limit: usize) -> BoltType {
    BoltType::from(i64::try_from(limit).unwrap_or(i64::MAX))
}
