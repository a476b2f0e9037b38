// Allow non-const functions that use f64 range checks (not const-stable yet)
#![allow(clippy::missing_const_for_fn)]

//! Graph value objects shared by every backend.
//!
//! All types here are immutable value objects built fresh per backend call.
//! Soft-delete state is never materialized into them: deleted entities are
//! simply absent from results.
//!
//! | Type | Invariant |
//! |------|-----------|
//! | [`Node`] | Labels non-empty at creation (zero labels only logs a warning) |
//! | [`Edge`] | Non-empty `edge_type`, `weight` and `confidence` in `[0, 1]` |
//! | [`Path`] | `nodes.len() == edges.len() + 1` |
//! | [`TraversalParams`] | `max_depth >= 1`, `limit` unset or `>= 1` |
//!
//! # Example
//!
//! ```rust
//! use intelgraph::models::graph::{Edge, EdgeId, NodeId, TraversalParams, Direction};
//!
//! let edge = Edge::new(EdgeId::new("e1"), NodeId::new("a"), NodeId::new("b"), "NEXT")
//!     .and_then(|e| e.with_weight(0.5))
//!     .unwrap();
//! assert!((edge.traversal_cost() - 0.5).abs() < f64::EPSILON);
//!
//! let params = TraversalParams::new(3).unwrap().with_direction(Direction::Both);
//! assert_eq!(params.max_depth, 3);
//! assert!(TraversalParams::new(0).is_err());
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Property map attached to nodes and edges.
///
/// Values are a tagged union (string, number, bool, null, list, nested map)
/// so properties survive a round trip through either backend unchanged.
pub type Properties = serde_json::Map<String, Value>;

/// Loosely-typed row returned by native passthrough queries.
pub type QueryRow = serde_json::Map<String, Value>;

/// Property names the backends use for bookkeeping on nodes.
pub const NODE_RESERVED_KEYS: &[&str] = &["id", "created_at", "updated_at", "deleted_at"];

/// Property names the backends use for bookkeeping on edges.
pub const EDGE_RESERVED_KEYS: &[&str] = &[
    "id",
    "created_at",
    "updated_at",
    "deleted_at",
    "weight",
    "confidence",
];

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an identifier from a string.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generates a new random identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the identifier, returning the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Opaque unique identifier of a node.
    NodeId
);

string_id!(
    /// Opaque unique identifier of an edge.
    EdgeId
);

/// Direction in which edges are followed during traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Follow edges from source to target.
    #[default]
    Outgoing,
    /// Follow edges from target to source.
    Incoming,
    /// Follow edges either way.
    Both,
}

impl Direction {
    /// Returns the direction as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Outgoing => "outgoing",
            Self::Incoming => "incoming",
            Self::Both => "both",
        }
    }

    /// Parses a direction from a string (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "outgoing" | "out" => Some(Self::Outgoing),
            "incoming" | "in" => Some(Self::Incoming),
            "both" | "any" => Some(Self::Both),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| Error::InvalidInput(format!("unknown direction: {s}")))
    }
}

/// A node in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier.
    pub id: NodeId,
    /// Ordered labels; the first one is the primary type.
    pub labels: Vec<String>,
    /// Arbitrary properties.
    #[serde(default)]
    pub properties: Properties,
    /// Hop count from the traversal origin (traversal results only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,
    /// Node ids from the traversal origin to this node (traversal results only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<NodeId>>,
}

impl Node {
    /// Creates a node.
    ///
    /// A node without labels is tolerated but logged, since backends reject
    /// label-less nodes at creation time.
    #[must_use]
    pub fn new(id: NodeId, labels: Vec<String>, properties: Properties) -> Self {
        if labels.is_empty() {
            tracing::warn!(node_id = %id, "Node constructed without labels");
        }
        Self {
            id,
            labels,
            properties,
            depth: None,
            path: None,
        }
    }

    /// Returns the primary label (the first one).
    #[must_use]
    pub fn primary_label(&self) -> Option<&str> {
        self.labels.first().map(String::as_str)
    }

    /// Returns true if the node carries the given label.
    #[must_use]
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// Returns true if the node carries at least one of the given labels.
    #[must_use]
    pub fn has_any_label(&self, labels: &[String]) -> bool {
        labels.iter().any(|l| self.has_label(l))
    }

    /// Annotates the node with traversal information.
    #[must_use]
    pub fn with_traversal(mut self, depth: u32, path: Vec<NodeId>) -> Self {
        self.depth = Some(depth);
        self.path = Some(path);
        self
    }

    /// Returns a property value by name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }
}

/// A directed, typed edge between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Unique identifier.
    pub id: EdgeId,
    /// Source node.
    pub source_id: NodeId,
    /// Target node.
    pub target_id: NodeId,
    /// Relationship type (analogous to a node label).
    pub edge_type: String,
    /// Arbitrary properties.
    #[serde(default)]
    pub properties: Properties,
    /// Strength of the relationship in `[0, 1]`.
    pub weight: f64,
    /// Certainty of the relationship in `[0, 1]`.
    pub confidence: f64,
}

impl Edge {
    /// Default weight for new edges.
    pub const DEFAULT_WEIGHT: f64 = 1.0;
    /// Default confidence for new edges.
    pub const DEFAULT_CONFIDENCE: f64 = 1.0;

    /// Creates an edge with default weight and confidence.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `edge_type` is empty.
    pub fn new(
        id: EdgeId,
        source_id: NodeId,
        target_id: NodeId,
        edge_type: impl Into<String>,
    ) -> Result<Self> {
        let edge_type = edge_type.into();
        validate_edge_type(&edge_type)?;
        if source_id == target_id {
            tracing::warn!(edge_id = %id, node_id = %source_id, "Self-loop edge");
        }
        Ok(Self {
            id,
            source_id,
            target_id,
            edge_type,
            properties: Properties::new(),
            weight: Self::DEFAULT_WEIGHT,
            confidence: Self::DEFAULT_CONFIDENCE,
        })
    }

    /// Sets the edge properties.
    #[must_use]
    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    /// Sets the weight.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `weight` is outside `[0, 1]`.
    pub fn with_weight(mut self, weight: f64) -> Result<Self> {
        validate_unit_interval("weight", weight)?;
        self.weight = weight;
        Ok(self)
    }

    /// Sets the confidence.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `confidence` is outside `[0, 1]`.
    pub fn with_confidence(mut self, confidence: f64) -> Result<Self> {
        validate_unit_interval("confidence", confidence)?;
        self.confidence = confidence;
        Ok(self)
    }

    /// Returns true if the edge starts and ends at the same node.
    #[must_use]
    pub fn is_self_loop(&self) -> bool {
        self.source_id == self.target_id
    }

    /// Cost of traversing this edge during path finding.
    ///
    /// `weight * confidence` is the effective strength of the relationship;
    /// cost is its complement, so strong and certain edges are cheap.
    #[must_use]
    pub fn traversal_cost(&self) -> f64 {
        edge_cost(self.weight, self.confidence)
    }

    /// Returns the endpoint opposite to `node`, if `node` is an endpoint.
    #[must_use]
    pub fn other_end(&self, node: &NodeId) -> Option<&NodeId> {
        if &self.source_id == node {
            Some(&self.target_id)
        } else if &self.target_id == node {
            Some(&self.source_id)
        } else {
            None
        }
    }
}

/// Traversal cost for an edge with the given weight and confidence.
#[must_use]
pub fn edge_cost(weight: f64, confidence: f64) -> f64 {
    (1.0 - weight * confidence).max(0.0)
}

/// An ordered walk through the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    /// Nodes from start to end.
    pub nodes: Vec<Node>,
    /// Edges connecting consecutive nodes.
    pub edges: Vec<Edge>,
    /// Sum of [`Edge::traversal_cost`] over all edges.
    pub total_weight: f64,
    /// Number of edges.
    pub length: usize,
}

impl Path {
    /// Creates a path, computing its length and total cost.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] unless `nodes.len() == edges.len() + 1`.
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Result<Self> {
        if nodes.len() != edges.len() + 1 {
            return Err(Error::InvalidInput(format!(
                "path must have exactly one more node than edges (nodes: {}, edges: {})",
                nodes.len(),
                edges.len()
            )));
        }
        let total_weight = edges.iter().map(Edge::traversal_cost).sum();
        let length = edges.len();
        Ok(Self {
            nodes,
            edges,
            total_weight,
            length,
        })
    }

    /// Creates a zero-length path consisting of a single node.
    #[must_use]
    pub fn single(node: Node) -> Self {
        Self {
            nodes: vec![node],
            edges: Vec::new(),
            total_weight: 0.0,
            length: 0,
        }
    }

    /// Returns the first node.
    #[must_use]
    pub fn start(&self) -> Option<&Node> {
        self.nodes.first()
    }

    /// Returns the last node.
    #[must_use]
    pub fn end(&self) -> Option<&Node> {
        self.nodes.last()
    }

    /// Returns the node ids along the path.
    #[must_use]
    pub fn node_ids(&self) -> Vec<&NodeId> {
        self.nodes.iter().map(|n| &n.id).collect()
    }
}

/// Parameters for bounded traversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalParams {
    /// Maximum hop count (at least 1).
    pub max_depth: u32,
    /// Direction in which edges are followed.
    #[serde(default)]
    pub direction: Direction,
    /// Only follow edges of these types.
    #[serde(default)]
    pub edge_types: Option<Vec<String>>,
    /// Only return nodes carrying at least one of these labels.
    #[serde(default)]
    pub node_labels: Option<Vec<String>>,
    /// Maximum number of nodes returned (at least 1).
    #[serde(default)]
    pub limit: Option<usize>,
}

impl TraversalParams {
    /// Creates outgoing traversal parameters with the given depth bound.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `max_depth` is zero.
    pub fn new(max_depth: u32) -> Result<Self> {
        validate_max_depth(max_depth)?;
        Ok(Self {
            max_depth,
            direction: Direction::Outgoing,
            edge_types: None,
            node_labels: None,
            limit: None,
        })
    }

    /// Sets the traversal direction.
    #[must_use]
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Restricts traversal to the given edge types.
    #[must_use]
    pub fn with_edge_types<I, S>(mut self, edge_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.edge_types = Some(edge_types.into_iter().map(Into::into).collect());
        self
    }

    /// Restricts returned nodes to the given labels.
    #[must_use]
    pub fn with_node_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.node_labels = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    /// Caps the number of returned nodes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `limit` is zero.
    pub fn with_limit(mut self, limit: usize) -> Result<Self> {
        validate_limit(limit)?;
        self.limit = Some(limit);
        Ok(self)
    }

    /// Re-checks the invariants (fields are public and may have been edited).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] on a zero depth or limit, or an empty
    /// edge type / label in a filter list.
    pub fn validate(&self) -> Result<()> {
        validate_max_depth(self.max_depth)?;
        if let Some(limit) = self.limit {
            validate_limit(limit)?;
        }
        if let Some(types) = &self.edge_types {
            for t in types {
                validate_edge_type(t)?;
            }
        }
        if let Some(labels) = &self.node_labels {
            for l in labels {
                validate_label(l)?;
            }
        }
        Ok(())
    }

    /// Edge type filter, `None` when unset or empty.
    #[must_use]
    pub fn edge_type_filter(&self) -> Option<&[String]> {
        non_empty(self.edge_types.as_deref())
    }

    /// Node label filter, `None` when unset or empty.
    #[must_use]
    pub fn node_label_filter(&self) -> Option<&[String]> {
        non_empty(self.node_labels.as_deref())
    }
}

/// Specification of a node to create.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Identifier to use; generated when `None`.
    #[serde(default)]
    pub id: Option<NodeId>,
    /// Ordered labels (must be non-empty).
    pub labels: Vec<String>,
    /// Initial properties.
    #[serde(default)]
    pub properties: Properties,
}

impl NodeSpec {
    /// Creates a spec with the given labels and no properties.
    #[must_use]
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: None,
            labels: labels.into_iter().map(Into::into).collect(),
            properties: Properties::new(),
        }
    }

    /// Sets an explicit identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<NodeId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the properties.
    #[must_use]
    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    /// Validates labels and property names.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] on empty labels or reserved property names.
    pub fn validate(&self) -> Result<()> {
        validate_labels(&self.labels)?;
        validate_properties(&self.properties, NODE_RESERVED_KEYS)
    }

    /// Converts the spec into a node, generating an id if necessary.
    #[must_use]
    pub fn into_node(self) -> Node {
        Node::new(
            self.id.unwrap_or_else(NodeId::generate),
            self.labels,
            self.properties,
        )
    }
}

/// Specification of an edge to create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeSpec {
    /// Identifier to use; generated when `None`.
    #[serde(default)]
    pub id: Option<EdgeId>,
    /// Source node.
    pub source_id: NodeId,
    /// Target node.
    pub target_id: NodeId,
    /// Relationship type.
    pub edge_type: String,
    /// Initial properties.
    #[serde(default)]
    pub properties: Properties,
    /// Weight in `[0, 1]`.
    #[serde(default = "default_unit")]
    pub weight: f64,
    /// Confidence in `[0, 1]`.
    #[serde(default = "default_unit")]
    pub confidence: f64,
}

const fn default_unit() -> f64 {
    1.0
}

impl EdgeSpec {
    /// Creates a spec with default weight and confidence.
    #[must_use]
    pub fn new(
        source_id: impl Into<NodeId>,
        target_id: impl Into<NodeId>,
        edge_type: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            source_id: source_id.into(),
            target_id: target_id.into(),
            edge_type: edge_type.into(),
            properties: Properties::new(),
            weight: Edge::DEFAULT_WEIGHT,
            confidence: Edge::DEFAULT_CONFIDENCE,
        }
    }

    /// Sets an explicit identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<EdgeId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the properties.
    #[must_use]
    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    /// Sets the weight (validated by [`EdgeSpec::validate`]).
    #[must_use]
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Sets the confidence (validated by [`EdgeSpec::validate`]).
    #[must_use]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Validates type, ranges, endpoints and property names.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] on any violation.
    pub fn validate(&self) -> Result<()> {
        validate_edge_type(&self.edge_type)?;
        validate_unit_interval("weight", self.weight)?;
        validate_unit_interval("confidence", self.confidence)?;
        if self.source_id.as_str().is_empty() || self.target_id.as_str().is_empty() {
            return Err(Error::InvalidInput(
                "edge source_id and target_id are required".to_string(),
            ));
        }
        validate_properties(&self.properties, EDGE_RESERVED_KEYS)
    }

    /// Converts the spec into an edge, generating an id if necessary.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the spec is invalid.
    pub fn into_edge(self) -> Result<Edge> {
        self.validate()?;
        Edge::new(
            self.id.unwrap_or_else(EdgeId::generate),
            self.source_id,
            self.target_id,
            self.edge_type,
        )?
        .with_weight(self.weight)?
        .with_confidence(self.confidence)
        .map(|e| e.with_properties(self.properties))
    }
}

/// Nodes and the edges among them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Subgraph {
    /// Requested nodes that exist.
    pub nodes: Vec<Node>,
    /// Edges whose endpoints are both in `nodes`.
    pub edges: Vec<Edge>,
}

/// Statistics about the graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    /// Number of live nodes.
    pub node_count: usize,
    /// Number of live edges.
    pub edge_count: usize,
    /// Live nodes grouped by primary label.
    pub nodes_by_label: HashMap<String, usize>,
    /// Live edges grouped by type.
    pub edges_by_type: HashMap<String, usize>,
}

impl GraphStats {
    /// Average number of edges per node.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn avg_edges_per_node(&self) -> f64 {
        if self.node_count == 0 {
            0.0
        } else {
            self.edge_count as f64 / self.node_count as f64
        }
    }
}

// ============================================================================
// Validation helpers
// ============================================================================

fn non_empty(list: Option<&[String]>) -> Option<&[String]> {
    list.filter(|l| !l.is_empty())
}

pub(crate) fn validate_max_depth(max_depth: u32) -> Result<()> {
    if max_depth == 0 {
        return Err(Error::InvalidInput("max_depth must be at least 1".to_string()));
    }
    Ok(())
}

pub(crate) fn validate_limit(limit: usize) -> Result<()> {
    if limit == 0 {
        return Err(Error::InvalidInput("limit must be at least 1".to_string()));
    }
    Ok(())
}

fn validate_unit_interval(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(Error::InvalidInput(format!(
            "{name} must be within [0.0, 1.0], got {value}"
        )));
    }
    Ok(())
}

pub(crate) fn validate_edge_type(edge_type: &str) -> Result<()> {
    if edge_type.trim().is_empty() {
        return Err(Error::InvalidInput("edge_type must not be empty".to_string()));
    }
    Ok(())
}

fn validate_label(label: &str) -> Result<()> {
    if label.trim().is_empty() {
        return Err(Error::InvalidInput("labels must not be blank".to_string()));
    }
    Ok(())
}

pub(crate) fn validate_labels(labels: &[String]) -> Result<()> {
    if labels.is_empty() {
        return Err(Error::InvalidInput(
            "node requires at least one label".to_string(),
        ));
    }
    labels.iter().try_for_each(|l| validate_label(l))
}

pub(crate) fn validate_properties(properties: &Properties, reserved: &[&str]) -> Result<()> {
    match properties.keys().find(|k| reserved.contains(&k.as_str())) {
        Some(key) => Err(Error::InvalidInput(format!(
            "property name '{key}' is reserved"
        ))),
        None => Ok(()),
    }
}

/// Applies an update to an existing property map.
///
/// `merge = true` unions `updates` over `existing`; `merge = false` replaces.
pub(crate) fn apply_update(existing: Properties, updates: &Properties, merge: bool) -> Properties {
    if merge {
        let mut merged = existing;
        for (k, v) in updates {
            merged.insert(k.clone(), v.clone());
        }
        merged
    } else {
        updates.clone()
    }
}
