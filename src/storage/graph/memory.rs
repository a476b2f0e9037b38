//! In-memory graph backend.
//!
//! Provides a fast, non-persistent implementation of [`GraphBackend`] for
//! tests and local development. Data survives `disconnect()`/`connect()`
//! cycles of the same instance but not the process.

// Allow cognitive_complexity for graph traversal algorithms.
#![allow(clippy::cognitive_complexity)]

use super::{
    finish_traversal, non_empty, prepare_edge_batch, prepare_node_batch, rank_paths, read_lock,
    record_created, validate_edge_update, validate_new_node, validate_node_update,
    validate_optional_limit, validate_path_bounds, validate_query, write_lock,
};
use crate::models::graph::{
    Direction, Edge, EdgeId, EdgeSpec, GraphStats, Node, NodeId, NodeSpec, Path, Properties,
    QueryRow, Subgraph, TraversalParams, apply_update,
};
use crate::storage::traits::GraphBackend;
use crate::{Error, Result, current_timestamp};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::instrument;

const BACKEND: &str = "memory";

#[derive(Debug, Clone)]
struct StoredNode {
    node: Node,
    deleted_at: Option<u64>,
}

#[derive(Debug, Clone)]
struct StoredEdge {
    edge: Edge,
    deleted_at: Option<u64>,
}

#[derive(Debug, Default)]
struct GraphData {
    nodes: BTreeMap<NodeId, StoredNode>,
    edges: BTreeMap<EdgeId, StoredEdge>,
}

impl GraphData {
    fn live_node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes
            .get(id)
            .filter(|s| s.deleted_at.is_none())
            .map(|s| &s.node)
    }

    fn live_edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edges
            .get(id)
            .filter(|s| s.deleted_at.is_none())
            .map(|s| &s.edge)
    }

    fn live_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes
            .values()
            .filter(|s| s.deleted_at.is_none())
            .map(|s| &s.node)
    }

    /// Live edges whose endpoints are both live.
    fn live_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges
            .values()
            .filter(|s| s.deleted_at.is_none())
            .map(|s| &s.edge)
            .filter(|e| {
                self.live_node(&e.source_id).is_some() && self.live_node(&e.target_id).is_some()
            })
    }

    /// Adjacency over live edges: node -> (neighbor, edge) in the given direction.
    fn adjacency(
        &self,
        direction: Direction,
        edge_types: Option<&[String]>,
    ) -> HashMap<&NodeId, Vec<(&NodeId, &Edge)>> {
        let mut adjacency: HashMap<&NodeId, Vec<(&NodeId, &Edge)>> = HashMap::new();
        let edges = self
            .live_edges()
            .filter(|e| edge_types.is_none_or(|types| types.contains(&e.edge_type)));
        for edge in edges {
            if matches!(direction, Direction::Outgoing | Direction::Both) {
                adjacency
                    .entry(&edge.source_id)
                    .or_default()
                    .push((&edge.target_id, edge));
            }
            if matches!(direction, Direction::Incoming | Direction::Both) {
                adjacency
                    .entry(&edge.target_id)
                    .or_default()
                    .push((&edge.source_id, edge));
            }
        }
        adjacency
    }

    fn check_endpoints(&self, edge: &Edge) -> Result<()> {
        for id in [&edge.source_id, &edge.target_id] {
            if self.live_node(id).is_none() {
                return Err(Error::NotFound {
                    kind: "node",
                    id: id.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// In-memory graph backend.
///
/// Uses `RwLock` for thread-safe access with reader-writer semantics.
///
/// # Example
///
/// ```rust,ignore
/// use intelgraph::storage::graph::InMemoryGraphBackend;
/// use intelgraph::GraphBackend;
///
/// let backend = InMemoryGraphBackend::new();
/// backend.connect().await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryGraphBackend {
    connected: AtomicBool,
    data: RwLock<GraphData>,
}

impl InMemoryGraphBackend {
    /// Creates a new empty, disconnected backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.connected.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(Error::NotConnected { backend: BACKEND })
        }
    }

    fn insert_nodes(&self, nodes: &[Node]) -> Result<()> {
        let mut data = write_lock(&self.data, BACKEND);
        let mut seen = HashSet::new();
        for node in nodes {
            if data.nodes.contains_key(&node.id) || !seen.insert(&node.id) {
                return Err(Error::operation(
                    "create_node",
                    format!("node already exists: {}", node.id),
                ));
            }
        }
        for node in nodes {
            data.nodes.insert(
                node.id.clone(),
                StoredNode {
                    node: node.clone(),
                    deleted_at: None,
                },
            );
        }
        Ok(())
    }

    fn insert_edges(&self, edges: &[Edge]) -> Result<()> {
        let mut data = write_lock(&self.data, BACKEND);
        let mut seen = HashSet::new();
        for edge in edges {
            data.check_endpoints(edge)?;
            if data.edges.contains_key(&edge.id) || !seen.insert(&edge.id) {
                return Err(Error::operation(
                    "create_edge",
                    format!("edge already exists: {}", edge.id),
                ));
            }
        }
        for edge in edges {
            data.edges.insert(
                edge.id.clone(),
                StoredEdge {
                    edge: edge.clone(),
                    deleted_at: None,
                },
            );
        }
        Ok(())
    }

    /// Layered BFS over outgoing edges that keeps the cheapest route into each
    /// node of the current layer.
    ///
    /// Every prefix of a fewest-hop route is itself a fewest-hop route, so the
    /// cheapest route per node and layer is enough to pick the cheapest
    /// fewest-hop route into `end`. Equal costs keep the route found first.
    fn shortest_path<'a>(
        data: &'a GraphData,
        start: &'a NodeId,
        end: &NodeId,
        max_depth: u32,
        edge_types: Option<&[String]>,
    ) -> Option<Path> {
        type Route<'r> = (f64, Vec<&'r NodeId>, Vec<&'r Edge>);

        let adjacency = data.adjacency(Direction::Outgoing, edge_types);
        let mut visited: HashSet<&NodeId> = HashSet::from([start]);
        let mut layer: BTreeMap<&NodeId, Route<'_>> =
            BTreeMap::from([(start, (0.0, vec![start], Vec::new()))]);

        for _ in 0..max_depth {
            let mut next_layer: BTreeMap<&NodeId, Route<'_>> = BTreeMap::new();
            for (current, (cost, nodes, edges)) in &layer {
                for &(next, edge) in adjacency.get(current).into_iter().flatten() {
                    if visited.contains(next) {
                        continue;
                    }
                    let candidate = cost + edge.traversal_cost();
                    if next_layer
                        .get(next)
                        .is_some_and(|(best, _, _)| *best <= candidate)
                    {
                        continue;
                    }
                    let mut nodes = nodes.clone();
                    nodes.push(next);
                    let mut edges = edges.clone();
                    edges.push(edge);
                    next_layer.insert(next, (candidate, nodes, edges));
                }
            }
            if let Some((_, nodes, edges)) = next_layer.remove(end) {
                let nodes = nodes
                    .into_iter()
                    .filter_map(|id| data.live_node(id).cloned())
                    .collect();
                let edges = edges.into_iter().cloned().collect();
                return Path::new(nodes, edges).ok();
            }
            if next_layer.is_empty() {
                return None;
            }
            visited.extend(next_layer.keys().copied());
            layer = next_layer;
        }
        None
    }

    /// Enumerates simple outgoing paths from `start` to `end` up to `max_depth` edges.
    fn simple_paths<'a>(
        data: &'a GraphData,
        start: &'a NodeId,
        end: &NodeId,
        max_depth: u32,
        edge_types: Option<&[String]>,
    ) -> Vec<Path> {
        let adjacency = data.adjacency(Direction::Outgoing, edge_types);
        let mut found = Vec::new();
        let mut node_stack = vec![start];
        let mut edge_stack: Vec<&Edge> = Vec::new();
        Self::walk(
            data,
            &adjacency,
            end,
            max_depth as usize,
            &mut node_stack,
            &mut edge_stack,
            &mut found,
        );
        rank_paths(&mut found);
        found
    }

    fn walk<'a>(
        data: &'a GraphData,
        adjacency: &HashMap<&'a NodeId, Vec<(&'a NodeId, &'a Edge)>>,
        end: &NodeId,
        max_depth: usize,
        node_stack: &mut Vec<&'a NodeId>,
        edge_stack: &mut Vec<&'a Edge>,
        found: &mut Vec<Path>,
    ) {
        let Some(current) = node_stack.last().copied() else {
            return;
        };
        if current == end && !edge_stack.is_empty() {
            let nodes = node_stack
                .iter()
                .filter_map(|id| data.live_node(id).cloned())
                .collect();
            let edges = edge_stack.iter().map(|e| (*e).clone()).collect();
            if let Ok(path) = Path::new(nodes, edges) {
                found.push(path);
            }
            return;
        }
        if edge_stack.len() >= max_depth {
            return;
        }
        for &(next, edge) in adjacency.get(current).into_iter().flatten() {
            if node_stack.contains(&next) {
                continue;
            }
            node_stack.push(next);
            edge_stack.push(edge);
            Self::walk(data, adjacency, end, max_depth, node_stack, edge_stack, found);
            node_stack.pop();
            edge_stack.pop();
        }
    }
}

#[async_trait]
impl GraphBackend for InMemoryGraphBackend {
    async fn connect(&self) -> Result<()> {
        self.connected.store(true, Ordering::Release);
        tracing::debug!(backend = BACKEND, "Connected");
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.connected.store(false, Ordering::Release);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
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
        self.ensure_connected()?;
        let node = Node::new(
            id.unwrap_or_else(NodeId::generate),
            labels.to_vec(),
            properties,
        );
        self.insert_nodes(std::slice::from_ref(&node))?;
        record_created(BACKEND, "node", 1);
        Ok(node)
    }

    async fn get_node(&self, id: &NodeId) -> Result<Option<Node>> {
        self.ensure_connected()?;
        Ok(read_lock(&self.data, BACKEND).live_node(id).cloned())
    }

    #[instrument(skip(self, properties), fields(backend = BACKEND))]
    async fn update_node(
        &self,
        id: &NodeId,
        properties: Properties,
        merge: bool,
    ) -> Result<Node> {
        validate_node_update(&properties)?;
        self.ensure_connected()?;
        let mut data = write_lock(&self.data, BACKEND);
        let stored = data
            .nodes
            .get_mut(id)
            .filter(|s| s.deleted_at.is_none())
            .ok_or_else(|| Error::NotFound {
                kind: "node",
                id: id.to_string(),
            })?;
        let existing = std::mem::take(&mut stored.node.properties);
        stored.node.properties = apply_update(existing, &properties, merge);
        Ok(stored.node.clone())
    }

    #[instrument(skip(self), fields(backend = BACKEND))]
    async fn delete_node(&self, id: &NodeId, soft: bool) -> Result<bool> {
        self.ensure_connected()?;
        let mut data = write_lock(&self.data, BACKEND);
        if soft {
            let now = current_timestamp();
            let Some(stored) = data.nodes.get_mut(id).filter(|s| s.deleted_at.is_none()) else {
                return Ok(false);
            };
            stored.deleted_at = Some(now);
            data.edges
                .values_mut()
                .filter(|s| {
                    s.deleted_at.is_none() && (&s.edge.source_id == id || &s.edge.target_id == id)
                })
                .for_each(|s| s.deleted_at = Some(now));
            Ok(true)
        } else {
            if data.nodes.remove(id).is_none() {
                return Ok(false);
            }
            data.edges
                .retain(|_, s| &s.edge.source_id != id && &s.edge.target_id != id);
            Ok(true)
        }
    }

    #[instrument(skip(self, spec), fields(backend = BACKEND))]
    async fn create_edge(&self, spec: EdgeSpec) -> Result<Edge> {
        let edge = spec.into_edge()?;
        self.ensure_connected()?;
        self.insert_edges(std::slice::from_ref(&edge))?;
        record_created(BACKEND, "edge", 1);
        Ok(edge)
    }

    async fn get_edge(&self, id: &EdgeId) -> Result<Option<Edge>> {
        self.ensure_connected()?;
        Ok(read_lock(&self.data, BACKEND).live_edge(id).cloned())
    }

    #[instrument(skip(self, properties), fields(backend = BACKEND))]
    async fn update_edge(
        &self,
        id: &EdgeId,
        properties: Properties,
        merge: bool,
    ) -> Result<Edge> {
        validate_edge_update(&properties)?;
        self.ensure_connected()?;
        let mut data = write_lock(&self.data, BACKEND);
        let stored = data
            .edges
            .get_mut(id)
            .filter(|s| s.deleted_at.is_none())
            .ok_or_else(|| Error::NotFound {
                kind: "edge",
                id: id.to_string(),
            })?;
        let existing = std::mem::take(&mut stored.edge.properties);
        stored.edge.properties = apply_update(existing, &properties, merge);
        Ok(stored.edge.clone())
    }

    #[instrument(skip(self), fields(backend = BACKEND))]
    async fn delete_edge(&self, id: &EdgeId, soft: bool) -> Result<bool> {
        self.ensure_connected()?;
        let mut data = write_lock(&self.data, BACKEND);
        if soft {
            Ok(data
                .edges
                .get_mut(id)
                .filter(|s| s.deleted_at.is_none())
                .map(|s| s.deleted_at = Some(current_timestamp()))
                .is_some())
        } else {
            Ok(data.edges.remove(id).is_some())
        }
    }

    #[instrument(skip(self, specs), fields(backend = BACKEND, count = specs.len()))]
    async fn batch_create_nodes(&self, specs: Vec<NodeSpec>) -> Result<Vec<Node>> {
        if specs.is_empty() {
            return Ok(Vec::new());
        }
        let nodes = prepare_node_batch(specs)?;
        self.ensure_connected()?;
        for chunk in nodes.chunks(super::BATCH_CHUNK_SIZE) {
            self.insert_nodes(chunk)?;
            record_created(BACKEND, "node", chunk.len());
        }
        Ok(nodes)
    }

    #[instrument(skip(self, specs), fields(backend = BACKEND, count = specs.len()))]
    async fn batch_create_edges(&self, specs: Vec<EdgeSpec>) -> Result<Vec<Edge>> {
        if specs.is_empty() {
            return Ok(Vec::new());
        }
        let edges = prepare_edge_batch(specs)?;
        self.ensure_connected()?;
        for chunk in edges.chunks(super::BATCH_CHUNK_SIZE) {
            self.insert_edges(chunk)?;
            record_created(BACKEND, "edge", chunk.len());
        }
        Ok(edges)
    }

    #[instrument(skip(self, params), fields(backend = BACKEND, max_depth = params.max_depth))]
    async fn traverse(&self, start_id: &NodeId, params: &TraversalParams) -> Result<Vec<Node>> {
        params.validate()?;
        self.ensure_connected()?;
        let data = read_lock(&self.data, BACKEND);
        if data.live_node(start_id).is_none() {
            return Ok(Vec::new());
        }
        let adjacency = data.adjacency(params.direction, params.edge_type_filter());
        let labels = params.node_label_filter();

        // BFS: the first visit of a node is at its minimum depth, along a simple path.
        let mut visited: HashSet<&NodeId> = HashSet::from([start_id]);
        let mut queue: VecDeque<(&NodeId, u32, Vec<NodeId>)> = VecDeque::new();
        queue.push_back((start_id, 0, vec![start_id.clone()]));
        let mut reached = Vec::new();

        while let Some((current, depth, path)) = queue.pop_front() {
            if depth >= params.max_depth {
                continue;
            }
            for &(next, _) in adjacency.get(current).into_iter().flatten() {
                if !visited.insert(next) {
                    continue;
                }
                let mut next_path = path.clone();
                next_path.push(next.clone());
                if let Some(node) = data.live_node(next) {
                    if labels.is_none_or(|l| node.has_any_label(l)) {
                        reached.push(
                            node.clone()
                                .with_traversal(depth + 1, next_path.clone()),
                        );
                    }
                }
                queue.push_back((next, depth + 1, next_path));
            }
        }
        metrics::counter!("graph_traversals_total", "backend" => BACKEND).increment(1);
        Ok(finish_traversal(reached, params.limit))
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
        self.ensure_connected()?;
        let data = read_lock(&self.data, BACKEND);
        let Some(start) = data.live_node(start_id) else {
            return Ok(None);
        };
        if start_id == end_id {
            return Ok(Some(Path::single(start.clone())));
        }
        Ok(Self::shortest_path(&data, start_id, end_id, max_depth, non_empty(edge_types)))
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
        self.ensure_connected()?;
        let data = read_lock(&self.data, BACKEND);
        let Some(start) = data.live_node(start_id) else {
            return Ok(Vec::new());
        };
        if start_id == end_id {
            return Ok(vec![Path::single(start.clone())]);
        }
        let mut paths = Self::simple_paths(&data, start_id, end_id, max_depth, None);
        paths.truncate(limit);
        Ok(paths)
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
        self.ensure_connected()?;
        let data = read_lock(&self.data, BACKEND);
        if data.live_node(id).is_none() {
            return Ok(Vec::new());
        }
        let adjacency = data.adjacency(direction, non_empty(edge_types));
        let unique: BTreeMap<&NodeId, &Node> = adjacency
            .get(id)
            .into_iter()
            .flatten()
            .filter(|(next, _)| *next != id)
            .filter_map(|(next, _)| data.live_node(next).map(|n| (*next, n)))
            .collect();
        Ok(unique
            .into_values()
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn get_subgraph(&self, node_ids: &[NodeId], include_edges: bool) -> Result<Subgraph> {
        self.ensure_connected()?;
        let data = read_lock(&self.data, BACKEND);
        let mut seen = HashSet::new();
        let nodes: Vec<Node> = node_ids
            .iter()
            .filter(|id| seen.insert(*id))
            .filter_map(|id| data.live_node(id).cloned())
            .collect();
        let edges = if include_edges {
            let members: HashSet<&NodeId> = nodes.iter().map(|n| &n.id).collect();
            data.live_edges()
                .filter(|e| members.contains(&e.source_id) && members.contains(&e.target_id))
                .cloned()
                .collect()
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
        self.ensure_connected()?;
        let labels = non_empty(labels);
        let data = read_lock(&self.data, BACKEND);
        Ok(data
            .live_nodes()
            .filter(|n| labels.is_none_or(|l| n.has_any_label(l)))
            .filter(|n| {
                properties.is_none_or(|props| {
                    props.iter().all(|(k, v)| n.properties.get(k) == Some(v))
                })
            })
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn find_edges(
        &self,
        edge_types: Option<&[String]>,
        source_id: Option<&NodeId>,
        target_id: Option<&NodeId>,
        limit: Option<usize>,
    ) -> Result<Vec<Edge>> {
        validate_optional_limit(limit)?;
        self.ensure_connected()?;
        let edge_types = non_empty(edge_types);
        let data = read_lock(&self.data, BACKEND);
        Ok(data
            .live_edges()
            .filter(|e| edge_types.is_none_or(|t| t.contains(&e.edge_type)))
            .filter(|e| source_id.is_none_or(|s| &e.source_id == s))
            .filter(|e| target_id.is_none_or(|t| &e.target_id == t))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn execute_query(&self, query: &str, _parameters: &Properties) -> Result<Vec<QueryRow>> {
        validate_query(query)?;
        self.ensure_connected()?;
        Err(Error::operation(
            "execute_query",
            "the in-memory backend has no native query language",
        ))
    }

    async fn count_nodes(&self, labels: Option<&[String]>) -> Result<usize> {
        self.ensure_connected()?;
        let labels = non_empty(labels);
        let data = read_lock(&self.data, BACKEND);
        Ok(data
            .live_nodes()
            .filter(|n| labels.is_none_or(|l| n.has_any_label(l)))
            .count())
    }

    async fn count_edges(&self, edge_types: Option<&[String]>) -> Result<usize> {
        self.ensure_connected()?;
        let edge_types = non_empty(edge_types);
        let data = read_lock(&self.data, BACKEND);
        Ok(data
            .live_edges()
            .filter(|e| edge_types.is_none_or(|t| t.contains(&e.edge_type)))
            .count())
    }

    async fn get_stats(&self) -> Result<GraphStats> {
        self.ensure_connected()?;
        let data = read_lock(&self.data, BACKEND);
        let mut stats = GraphStats::default();
        for node in data.live_nodes() {
            stats.node_count += 1;
            if let Some(label) = node.primary_label() {
                *stats.nodes_by_label.entry(label.to_string()).or_default() += 1;
            }
        }
        for edge in data.live_edges() {
            stats.edge_count += 1;
            *stats.edges_by_type.entry(edge.edge_type.clone()).or_default() += 1;
        }
        Ok(stats)
    }

    async fn clear(&self) -> Result<()> {
        self.ensure_connected()?;
        let mut data = write_lock(&self.data, BACKEND);
        data.nodes.clear();
        data.edges.clear();
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::redundant_clone)]
mod tests {
    use super::*;
    use serde_json::json;

    fn labels(l: &[&str]) -> Vec<String> {
        l.iter().map(ToString::to_string).collect()
    }

    fn props(value: serde_json::Value) -> Properties {
        match value {
            serde_json::Value::Object(map) => map,
            _ => Properties::new(),
        }
    }

    async fn connected() -> InMemoryGraphBackend {
        let backend = InMemoryGraphBackend::new();
        backend.connect().await.unwrap();
        backend
    }

    async fn node(backend: &InMemoryGraphBackend, id: &str) -> Node {
        backend
            .create_node(&labels(&["Node"]), Properties::new(), Some(NodeId::new(id)))
            .await
            .unwrap()
    }

    async fn edge(backend: &InMemoryGraphBackend, from: &str, to: &str) -> Edge {
        backend
            .create_edge(EdgeSpec::new(from, to, "NEXT"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_not_connected() {
        let backend = InMemoryGraphBackend::new();
        let err = backend.get_node(&NodeId::new("x")).await.unwrap_err();
        assert!(matches!(err, Error::NotConnected { backend: "memory" }));

        backend.connect().await.unwrap();
        assert!(backend.get_node(&NodeId::new("x")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_validation_before_connection_check() {
        let backend = InMemoryGraphBackend::new();
        let err = backend
            .create_node(&[], Properties::new(), None)
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_duplicate_node_id_rejected() {
        let backend = connected().await;
        node(&backend, "a").await;
        let err = backend
            .create_node(&labels(&["Node"]), Properties::new(), Some(NodeId::new("a")))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::OperationFailed { .. }));
    }

    #[tokio::test]
    async fn test_soft_delete_cascades_to_edges() {
        let backend = connected().await;
        node(&backend, "a").await;
        node(&backend, "b").await;
        let e = edge(&backend, "a", "b").await;

        assert!(backend.delete_node(&NodeId::new("b"), true).await.unwrap());
        assert!(backend.get_edge(&e.id).await.unwrap().is_none());
        assert_eq!(backend.count_edges(None).await.unwrap(), 0);

        // Re-deleting reports nothing to delete; hard delete still purges the row.
        assert!(!backend.delete_node(&NodeId::new("b"), true).await.unwrap());
        assert!(backend.delete_node(&NodeId::new("b"), false).await.unwrap());
    }

    #[tokio::test]
    async fn test_hard_delete_detaches_edges() {
        let backend = connected().await;
        node(&backend, "a").await;
        node(&backend, "b").await;
        edge(&backend, "a", "b").await;

        assert!(backend.delete_node(&NodeId::new("a"), false).await.unwrap());
        assert!(!backend.delete_node(&NodeId::new("a"), false).await.unwrap());
        assert_eq!(backend.count_edges(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_edge_to_deleted_node_fails() {
        let backend = connected().await;
        node(&backend, "a").await;
        node(&backend, "b").await;
        backend.delete_node(&NodeId::new("b"), true).await.unwrap();

        let err = backend
            .create_edge(EdgeSpec::new("a", "b", "T"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_batch_rejects_unknown_endpoint_atomically() {
        let backend = connected().await;
        node(&backend, "a").await;
        node(&backend, "b").await;

        let result = backend
            .batch_create_edges(vec![
                EdgeSpec::new("a", "b", "T"),
                EdgeSpec::new("a", "missing", "T"),
            ])
            .await;
        assert!(result.is_err());
        assert_eq!(backend.count_edges(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_traverse_directions() {
        let backend = connected().await;
        for id in ["a", "b", "c"] {
            node(&backend, id).await;
        }
        edge(&backend, "a", "b").await;
        edge(&backend, "c", "b").await;

        let out = backend
            .traverse(&NodeId::new("b"), &TraversalParams::new(2).unwrap())
            .await
            .unwrap();
        assert!(out.is_empty());

        let incoming = backend
            .traverse(
                &NodeId::new("b"),
                &TraversalParams::new(2)
                    .unwrap()
                    .with_direction(Direction::Incoming),
            )
            .await
            .unwrap();
        let ids: Vec<_> = incoming.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);

        let both = backend
            .traverse(
                &NodeId::new("a"),
                &TraversalParams::new(2).unwrap().with_direction(Direction::Both),
            )
            .await
            .unwrap();
        assert_eq!(both.len(), 2);
        assert_eq!(both[1].id.as_str(), "c");
        assert_eq!(both[1].depth, Some(2));
    }

    #[tokio::test]
    async fn test_traverse_label_filter_passes_through() {
        let backend = connected().await;
        node(&backend, "a").await;
        node(&backend, "b").await;
        backend
            .create_node(&labels(&["Target"]), Properties::new(), Some(NodeId::new("c")))
            .await
            .unwrap();
        edge(&backend, "a", "b").await;
        edge(&backend, "b", "c").await;

        let result = backend
            .traverse(
                &NodeId::new("a"),
                &TraversalParams::new(3).unwrap().with_node_labels(["Target"]),
            )
            .await
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id.as_str(), "c");
        assert_eq!(
            result[0].path.as_deref().unwrap(),
            &[NodeId::new("a"), NodeId::new("b"), NodeId::new("c")]
        );
    }

    #[tokio::test]
    async fn test_neighbors_deduplicated() {
        let backend = connected().await;
        node(&backend, "a").await;
        node(&backend, "b").await;
        edge(&backend, "a", "b").await;
        edge(&backend, "a", "b").await;
        edge(&backend, "b", "a").await;

        let neighbors = backend
            .get_neighbors(&NodeId::new("a"), Direction::Both, None, None)
            .await
            .unwrap();
        assert_eq!(neighbors.len(), 1);
    }

    #[tokio::test]
    async fn test_find_nodes_exact_match() {
        let backend = connected().await;
        backend
            .create_node(
                &labels(&["Host"]),
                props(json!({"name": "web-1", "port": 80})),
                None,
            )
            .await
            .unwrap();
        backend
            .create_node(&labels(&["Host"]), props(json!({"name": "web-10"})), None)
            .await
            .unwrap();

        let found = backend
            .find_nodes(None, Some(&props(json!({"name": "web-1"}))), None)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].properties["port"], json!(80));
    }

    #[tokio::test]
    async fn test_shortest_path_on_dense_graph() {
        // Complete digraph without the direct s0 -> s11 edge. Every two-hop
        // route ties on length; only the one through s5 has full weight.
        let backend = connected().await;
        let specs = (0..12)
            .map(|i| NodeSpec::new(["Node"]).with_id(format!("s{i}")))
            .collect();
        backend.batch_create_nodes(specs).await.unwrap();
        let mut edges = Vec::new();
        for from in 0..12 {
            for to in 0..12 {
                if from == to || (from == 0 && to == 11) {
                    continue;
                }
                let weight = if to == 5 || from == 5 { 1.0 } else { 0.5 };
                edges.push(
                    EdgeSpec::new(format!("s{from}"), format!("s{to}"), "NEXT").with_weight(weight),
                );
            }
        }
        backend.batch_create_edges(edges).await.unwrap();

        let path = backend
            .find_shortest_path(&NodeId::new("s0"), &NodeId::new("s11"), 11, None)
            .await
            .unwrap()
            .unwrap();
        let route: Vec<&str> = path.node_ids().into_iter().map(NodeId::as_str).collect();
        assert_eq!(route, vec!["s0", "s5", "s11"]);
        assert_eq!(path.length, 2);
        assert!(path.total_weight.abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_shortest_path_skips_deleted_nodes() {
        let backend = connected().await;
        for id in ["a", "b", "c", "d"] {
            node(&backend, id).await;
        }
        edge(&backend, "a", "b").await;
        edge(&backend, "b", "d").await;
        edge(&backend, "a", "c").await;
        edge(&backend, "c", "d").await;
        assert!(backend.delete_node(&NodeId::new("b"), true).await.unwrap());

        let path = backend
            .find_shortest_path(&NodeId::new("a"), &NodeId::new("d"), 3, None)
            .await
            .unwrap()
            .unwrap();
        let route: Vec<&str> = path.node_ids().into_iter().map(NodeId::as_str).collect();
        assert_eq!(route, vec!["a", "c", "d"]);
    }

    #[tokio::test]
    async fn test_stats_group_by_primary_label() {
        let backend = connected().await;
        backend
            .create_node(&labels(&["Host", "Asset"]), Properties::new(), None)
            .await
            .unwrap();
        backend
            .create_node(&labels(&["User"]), Properties::new(), None)
            .await
            .unwrap();

        let stats = backend.get_stats().await.unwrap();
        assert_eq!(stats.node_count, 2);
        assert_eq!(stats.nodes_by_label.get("Host"), Some(&1));
        assert!(!stats.nodes_by_label.contains_key("Asset"));
        assert_eq!(backend.count_nodes(Some(&labels(&["Asset"]))).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_execute_query_unsupported() {
        let backend = connected().await;
        assert!(backend.execute_query("", &Properties::new()).await.unwrap_err().is_validation());
        assert!(
            backend
                .execute_query("MATCH (n) RETURN n", &Properties::new())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_clear_and_reconnect_keeps_data() {
        let backend = connected().await;
        node(&backend, "a").await;
        backend.disconnect().await.unwrap();
        assert!(!backend.is_connected());
        backend.connect().await.unwrap();
        assert_eq!(backend.count_nodes(None).await.unwrap(), 1);

        backend.clear().await.unwrap();
        assert_eq!(backend.count_nodes(None).await.unwrap(), 0);
    }
}
