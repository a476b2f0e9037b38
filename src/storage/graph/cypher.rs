//! Cypher text and Bolt value conversion for the Memgraph backend.
//!
//! Labels, relationship types and property keys cannot be query parameters
//! in Cypher, so they are interpolated as backtick-escaped identifiers.
//! Everything else (ids, property maps, filters, timestamps) is bound as a
//! parameter.
//!
//! Every node read returns a `{id, labels, props}` map and every edge read a
//! `{id, type, source, target, props}` map, decoded into [`NodeRecord`] and
//! [`EdgeRecord`].

use crate::models::graph::{Direction, Edge, EdgeId, Node, NodeId, Properties};
use neo4rs::{BoltBoolean, BoltFloat, BoltInteger, BoltList, BoltMap, BoltNull, BoltString, BoltType};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Write as _;

/// Properties the backend maintains on every node.
pub const NODE_SYSTEM_KEYS: &[&str] = &["id", "created_at", "updated_at", "deleted_at"];

const NODE_MAP: &str = "{id: n.id, labels: labels(n), props: properties(n)}";
const EDGE_MAP: &str =
    "{id: r.id, type: type(r), source: s.id, target: t.id, props: properties(r)}";

/// Filters ensuring every node and relationship of `p` is live and no node repeats.
const LIVE_SIMPLE_PATH: &str = "ALL(x IN nodes(p) WHERE x.deleted_at IS NULL) \
     AND ALL(rel IN relationships(p) WHERE rel.deleted_at IS NULL) \
     AND ALL(i IN range(0, size(nodes(p)) - 2) WHERE NOT nodes(p)[i] IN nodes(p)[i + 1..])";

/// Escapes an identifier for interpolation: `` a`b `` becomes `` `a``b` ``.
#[must_use]
pub fn escape_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// `:`A`:`B`` label expression.
#[must_use]
pub fn label_expr(labels: &[String]) -> String {
    labels.iter().fold(String::new(), |mut out, label| {
        let _ = write!(out, ":{}", escape_identifier(label));
        out
    })
}

/// `:`T1`|`T2`` relationship type alternation, empty when unfiltered.
#[must_use]
pub fn type_expr(edge_types: Option<&[String]>) -> String {
    match edge_types {
        Some(types) if !types.is_empty() => {
            let alternatives: Vec<String> = types.iter().map(|t| escape_identifier(t)).collect();
            format!(":{}", alternatives.join("|"))
        },
        _ => String::new(),
    }
}

/// Wraps a relationship pattern in the arrows for a direction.
fn arrows(direction: Direction, inner: &str) -> String {
    match direction {
        Direction::Outgoing => format!("-[{inner}]->"),
        Direction::Incoming => format!("<-[{inner}]-"),
        Direction::Both => format!("-[{inner}]-"),
    }
}

fn limit_clause(limited: bool) -> &'static str {
    if limited { " LIMIT $limit" } else { "" }
}

// ============================================================================
// Nodes
// ============================================================================

/// `$id`, `$props`, `$now`.
#[must_use]
pub fn create_node(labels: &[String]) -> String {
    format!(
        "CREATE (n{}) SET n += $props, n.id = $id, n.created_at = $now, n.updated_at = $now",
        label_expr(labels)
    )
}

/// One `UNWIND` statement creating every row of a label group.
///
/// `$rows` is a list of `{id, props}` maps; `$now`.
#[must_use]
pub fn create_nodes(labels: &[String]) -> String {
    format!(
        "UNWIND $rows AS row CREATE (n{}) SET n += row.props, n.id = row.id, n.created_at = $now, n.updated_at = $now",
        label_expr(labels)
    )
}

/// `$ids`: returns the ids that already exist (live or deleted).
#[must_use]
pub fn existing_node_ids() -> String {
    "MATCH (n) WHERE n.id IN $ids RETURN n.id AS id".to_string()
}

/// `$ids`: returns the ids that are live.
#[must_use]
pub fn live_node_ids() -> String {
    "MATCH (n) WHERE n.id IN $ids AND n.deleted_at IS NULL RETURN n.id AS id".to_string()
}

/// `$id`.
#[must_use]
pub fn get_node() -> String {
    format!("MATCH (n {{id: $id}}) WHERE n.deleted_at IS NULL RETURN {NODE_MAP} AS node")
}

/// `$id`, `$props`, `$now`. Replacing keeps the system properties.
#[must_use]
pub fn update_node(merge: bool) -> String {
    if merge {
        format!(
            "MATCH (n {{id: $id}}) WHERE n.deleted_at IS NULL \
             SET n += $props, n.updated_at = $now \
             RETURN {NODE_MAP} AS node"
        )
    } else {
        format!(
            "MATCH (n {{id: $id}}) WHERE n.deleted_at IS NULL \
             WITH n, n.created_at AS created \
             SET n = $props \
             SET n.id = $id, n.created_at = created, n.updated_at = $now \
             RETURN {NODE_MAP} AS node"
        )
    }
}

/// `$id`, `$now`; soft-deletes the node and its live relationships.
#[must_use]
pub fn soft_delete_node() -> String {
    "MATCH (n {id: $id}) WHERE n.deleted_at IS NULL \
     SET n.deleted_at = $now, n.updated_at = $now \
     WITH n \
     OPTIONAL MATCH (n)-[r]-() WHERE r.deleted_at IS NULL \
     WITH n, collect(r) AS rels \
     FOREACH (rel IN rels | SET rel.deleted_at = $now, rel.updated_at = $now) \
     RETURN count(n) AS deleted"
        .to_string()
}

/// `$id`.
#[must_use]
pub fn hard_delete_node() -> String {
    "MATCH (n {id: $id}) DETACH DELETE n RETURN count(*) AS deleted".to_string()
}

/// `$labels` (list or null), `$filter_0..` property values, optional `$limit`.
#[must_use]
pub fn find_nodes(property_keys: &[&str], limited: bool) -> String {
    let mut query = "MATCH (n) WHERE n.deleted_at IS NULL \
                     AND ($labels IS NULL OR any(l IN labels(n) WHERE l IN $labels))"
        .to_string();
    for (index, key) in property_keys.iter().enumerate() {
        let _ = write!(query, " AND n.{} = $filter_{index}", escape_identifier(key));
    }
    let _ = write!(
        query,
        " WITH n ORDER BY n.id{} RETURN {NODE_MAP} AS node",
        limit_clause(limited)
    );
    query
}

/// `$labels` (list or null).
#[must_use]
pub fn count_nodes() -> String {
    "MATCH (n) WHERE n.deleted_at IS NULL \
     AND ($labels IS NULL OR any(l IN labels(n) WHERE l IN $labels)) \
     RETURN count(n) AS count"
        .to_string()
}

/// Live nodes grouped by primary label.
#[must_use]
pub fn nodes_by_label() -> String {
    "MATCH (n) WHERE n.deleted_at IS NULL RETURN labels(n)[0] AS key, count(n) AS count"
        .to_string()
}

// ============================================================================
// Edges
// ============================================================================

/// One `UNWIND` statement creating every row of a type group.
///
/// `$rows` is a list of `{id, source, target, weight, confidence, props}`; `$now`.
#[must_use]
pub fn create_edges(edge_type: &str) -> String {
    format!(
        "UNWIND $rows AS row \
         MATCH (s {{id: row.source}}), (t {{id: row.target}}) \
         WHERE s.deleted_at IS NULL AND t.deleted_at IS NULL \
         CREATE (s)-[r:{}]->(t) \
         SET r += row.props, r.id = row.id, r.weight = row.weight, r.confidence = row.confidence, \
             r.created_at = $now, r.updated_at = $now",
        escape_identifier(edge_type)
    )
}

/// `$ids`: returns the edge ids that already exist (live or deleted).
#[must_use]
pub fn existing_edge_ids() -> String {
    "MATCH ()-[r]->() WHERE r.id IN $ids RETURN r.id AS id".to_string()
}

/// `$id`.
#[must_use]
pub fn get_edge() -> String {
    format!("MATCH (s)-[r {{id: $id}}]->(t) WHERE r.deleted_at IS NULL RETURN {EDGE_MAP} AS edge")
}

/// `$id`, `$props`, `$now`. Replacing keeps system properties, weight and confidence.
#[must_use]
pub fn update_edge(merge: bool) -> String {
    if merge {
        format!(
            "MATCH (s)-[r {{id: $id}}]->(t) WHERE r.deleted_at IS NULL \
             SET r += $props, r.updated_at = $now \
             RETURN {EDGE_MAP} AS edge"
        )
    } else {
        format!(
            "MATCH (s)-[r {{id: $id}}]->(t) WHERE r.deleted_at IS NULL \
             WITH s, r, t, r.created_at AS created, r.weight AS weight, r.confidence AS confidence \
             SET r = $props \
             SET r.id = $id, r.created_at = created, r.weight = weight, r.confidence = confidence, r.updated_at = $now \
             RETURN {EDGE_MAP} AS edge"
        )
    }
}

/// `$id`, `$now`.
#[must_use]
pub fn soft_delete_edge() -> String {
    "MATCH ()-[r {id: $id}]->() WHERE r.deleted_at IS NULL \
     SET r.deleted_at = $now, r.updated_at = $now \
     RETURN count(r) AS deleted"
        .to_string()
}

/// `$id`.
#[must_use]
pub fn hard_delete_edge() -> String {
    "MATCH ()-[r {id: $id}]->() DELETE r RETURN count(*) AS deleted".to_string()
}

/// `$types`, `$source`, `$target` (each may be null), optional `$limit`.
#[must_use]
pub fn find_edges(limited: bool) -> String {
    format!(
        "MATCH (s)-[r]->(t) WHERE r.deleted_at IS NULL \
         AND ($types IS NULL OR type(r) IN $types) \
         AND ($source IS NULL OR s.id = $source) \
         AND ($target IS NULL OR t.id = $target) \
         WITH s, r, t ORDER BY r.id{} \
         RETURN {EDGE_MAP} AS edge",
        limit_clause(limited)
    )
}

/// `$ids`: live edges with both endpoints in the set.
#[must_use]
pub fn edges_among() -> String {
    format!(
        "MATCH (s)-[r]->(t) \
         WHERE s.id IN $ids AND t.id IN $ids \
           AND r.deleted_at IS NULL AND s.deleted_at IS NULL AND t.deleted_at IS NULL \
         WITH s, r, t ORDER BY r.id \
         RETURN {EDGE_MAP} AS edge"
    )
}

/// `$ids`: live nodes among the given ids.
#[must_use]
pub fn nodes_by_ids() -> String {
    format!("MATCH (n) WHERE n.id IN $ids AND n.deleted_at IS NULL RETURN {NODE_MAP} AS node")
}

/// `$types` (list or null).
#[must_use]
pub fn count_edges() -> String {
    "MATCH ()-[r]->() WHERE r.deleted_at IS NULL \
     AND ($types IS NULL OR type(r) IN $types) \
     RETURN count(r) AS count"
        .to_string()
}

/// Live edges grouped by type.
#[must_use]
pub fn edges_by_type() -> String {
    "MATCH ()-[r]->() WHERE r.deleted_at IS NULL RETURN type(r) AS key, count(r) AS count"
        .to_string()
}

/// Removes every node and relationship.
#[must_use]
pub fn clear() -> String {
    "MATCH (n) DETACH DELETE n".to_string()
}

// ============================================================================
// Traversal
// ============================================================================

/// Bounded traversal.
///
/// `$start_id`, `$labels` (list or null), optional `$limit`. Each reached
/// node keeps its minimum depth and the node ids of one minimum-depth path.
#[must_use]
pub fn traverse(
    direction: Direction,
    edge_types: Option<&[String]>,
    max_depth: u32,
    limited: bool,
) -> String {
    let pattern = arrows(direction, &format!("{}*1..{max_depth}", type_expr(edge_types)));
    format!(
        "MATCH p = (start {{id: $start_id}}){pattern}(n) \
         WHERE start.deleted_at IS NULL AND n.id <> $start_id AND {LIVE_SIMPLE_PATH} \
         WITH n, size(relationships(p)) AS depth, [x IN nodes(p) | x.id] AS path \
         ORDER BY depth \
         WITH n, collect({{depth: depth, path: path}})[0] AS best \
         WHERE $labels IS NULL OR any(l IN labels(n) WHERE l IN $labels) \
         WITH n, best ORDER BY best.depth, n.id{} \
         RETURN {NODE_MAP} AS node, best.depth AS depth, best.path AS path",
        limit_clause(limited)
    )
}

/// Simple outgoing paths from `$start_id` to `$end_id`, by length then cost.
///
/// `$limit` caps the number of paths.
#[must_use]
pub fn paths(edge_types: Option<&[String]>, max_depth: u32) -> String {
    let pattern = arrows(
        Direction::Outgoing,
        &format!("{}*1..{max_depth}", type_expr(edge_types)),
    );
    format!(
        "MATCH p = (start {{id: $start_id}}){pattern}(finish {{id: $end_id}}) \
         WHERE {LIVE_SIMPLE_PATH} \
         WITH p, size(relationships(p)) AS depth, \
              reduce(cost = 0.0, rel IN relationships(p) | cost + (1.0 - rel.weight * rel.confidence)) AS cost \
         ORDER BY depth, cost \
         LIMIT $limit \
         RETURN [n IN nodes(p) | {{id: n.id, labels: labels(n), props: properties(n)}}] AS nodes, \
                [r IN relationships(p) | {{id: r.id, type: type(r), source: startNode(r).id, target: endNode(r).id, props: properties(r)}}] AS edges"
    )
}

/// 1-hop neighbors of `$id`; `$limit` optional.
#[must_use]
pub fn neighbors(direction: Direction, edge_types: Option<&[String]>, limited: bool) -> String {
    let pattern = arrows(direction, &format!("r{}", type_expr(edge_types)));
    format!(
        "MATCH (start {{id: $id}}){pattern}(n) \
         WHERE start.deleted_at IS NULL AND r.deleted_at IS NULL AND n.deleted_at IS NULL AND n.id <> $id \
         WITH DISTINCT n ORDER BY n.id{} \
         RETURN {NODE_MAP} AS node",
        limit_clause(limited)
    )
}

// ============================================================================
// Records and value conversion
// ============================================================================

/// Node map as returned by every node read.
#[derive(Debug, Deserialize)]
pub struct NodeRecord {
    /// Mirrored identity.
    pub id: String,
    /// Labels in stored order.
    pub labels: Vec<String>,
    /// Raw properties including system keys.
    #[serde(default)]
    pub props: Properties,
}

impl NodeRecord {
    /// Converts into a [`Node`], dropping system properties.
    #[must_use]
    pub fn into_node(self) -> Node {
        let mut properties = self.props;
        for key in NODE_SYSTEM_KEYS {
            properties.remove(*key);
        }
        Node::new(NodeId::new(self.id), self.labels, properties)
    }
}

/// Edge map as returned by every edge read.
#[derive(Debug, Deserialize)]
pub struct EdgeRecord {
    /// Mirrored identity.
    pub id: String,
    /// Relationship type.
    #[serde(rename = "type")]
    pub edge_type: String,
    /// Source node id.
    pub source: String,
    /// Target node id.
    pub target: String,
    /// Raw properties including system keys, weight and confidence.
    #[serde(default)]
    pub props: Properties,
}

impl EdgeRecord {
    /// Converts into an [`Edge`], lifting weight and confidence out of the properties.
    #[must_use]
    pub fn into_edge(self) -> Edge {
        let mut properties = self.props;
        let mut take_unit = |key: &str| {
            properties
                .remove(key)
                .and_then(|v| v.as_f64())
                .unwrap_or(1.0)
        };
        let weight = take_unit("weight");
        let confidence = take_unit("confidence");
        for key in NODE_SYSTEM_KEYS {
            properties.remove(*key);
        }
        Edge {
            id: EdgeId::new(self.id),
            source_id: NodeId::new(self.source),
            target_id: NodeId::new(self.target),
            edge_type: self.edge_type,
            properties,
            weight,
            confidence,
        }
    }
}

/// Converts a JSON value into a Bolt value.
///
/// Integers that fit in `i64` stay integers; other numbers become floats.
#[must_use]
pub fn json_to_bolt(value: &Value) -> BoltType {
    match value {
        Value::Null => BoltType::Null(BoltNull),
        Value::Bool(b) => BoltType::Boolean(BoltBoolean::new(*b)),
        Value::Number(n) => n.as_i64().map_or_else(
            || BoltType::Float(BoltFloat::new(n.as_f64().unwrap_or(f64::NAN))),
            |i| BoltType::Integer(BoltInteger::new(i)),
        ),
        Value::String(s) => BoltType::String(BoltString::from(s.as_str())),
        Value::Array(items) => BoltType::List(BoltList {
            value: items.iter().map(json_to_bolt).collect(),
        }),
        Value::Object(map) => properties_to_bolt(map),
    }
}

/// Converts a property map into a Bolt map.
#[must_use]
pub fn properties_to_bolt(properties: &Properties) -> BoltType {
    let value: HashMap<BoltString, BoltType> = properties
        .iter()
        .map(|(k, v)| (BoltString::from(k.as_str()), json_to_bolt(v)))
        .collect();
    BoltType::Map(BoltMap { value })
}

/// Converts strings into a Bolt list.
#[must_use]
pub fn string_list<S: AsRef<str>>(items: &[S]) -> BoltType {
    BoltType::List(BoltList {
        value: items
            .iter()
            .map(|s| BoltType::String(BoltString::from(s.as_ref())))
            .collect(),
    })
}

/// Converts an optional filter list, `null` when unset or empty.
#[must_use]
pub fn optional_string_list(items: Option<&[String]>) -> BoltType {
    match items {
        Some(items) if !items.is_empty() => string_list(items),
        _ => BoltType::Null(BoltNull),
    }
}

/// Converts an optional string, `null` when unset.
#[must_use]
pub fn optional_string(value: Option<&str>) -> BoltType {
    value.map_or(BoltType::Null(BoltNull), |s| {
        BoltType::String(BoltString::from(s))
    })
}

/// Builds a Bolt map from string keys.
#[must_use]
pub fn bolt_map<I>(entries: I) -> BoltType
where
    I: IntoIterator<Item = (&'static str, BoltType)>,
{
    BoltType::Map(BoltMap {
        value: entries
            .into_iter()
            .map(|(k, v)| (BoltString::from(k), v))
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_escape_identifier() {
        assert_eq!(escape_identifier("Person"), "`Person`");
        assert_eq!(escape_identifier("we`ird"), "`we``ird`");
        assert_eq!(escape_identifier("has space"), "`has space`");
    }

    #[test]
    fn test_label_and_type_expressions() {
        assert_eq!(
            label_expr(&["Host".to_string(), "Asset".to_string()]),
            ":`Host`:`Asset`"
        );
        assert_eq!(
            type_expr(Some(&["USES".to_string(), "OWNS".to_string()])),
            ":`USES`|`OWNS`"
        );
        assert_eq!(type_expr(Some(&[])), "");
        assert_eq!(type_expr(None), "");
    }

    #[test]
    fn test_traverse_patterns() {
        let out = traverse(Direction::Outgoing, None, 3, false);
        assert!(out.contains("(start {id: $start_id})-[*1..3]->(n)"));
        assert!(out.contains("NOT nodes(p)[i] IN nodes(p)[i + 1..]"));
        assert!(!out.contains("LIMIT"));

        let incoming = traverse(Direction::Incoming, Some(&["T".to_string()]), 2, true);
        assert!(incoming.contains("<-[:`T`*1..2]-(n)"));
        assert!(incoming.contains("LIMIT $limit"));

        let both = traverse(Direction::Both, None, 1, false);
        assert!(both.contains("-[*1..1]-(n)"));
    }

    #[test]
    fn test_paths_cost_and_order() {
        let q = paths(None, 4);
        assert!(q.contains("-[*1..4]->(finish {id: $end_id})"));
        assert!(q.contains("1.0 - rel.weight * rel.confidence"));
        assert!(q.contains("ORDER BY depth, cost"));
    }

    #[test]
    fn test_find_nodes_escapes_keys() {
        let q = find_nodes(&["name", "odd`key"], true);
        assert!(q.contains("n.`name` = $filter_0"));
        assert!(q.contains("n.`odd``key` = $filter_1"));
        assert!(q.contains("LIMIT $limit"));
    }

    #[test]
    fn test_find_nodes_without_filters() {
        let q = find_nodes(&[], false);
        assert!(!q.contains("$filter_"));
        assert!(!q.contains("LIMIT"));
        assert!(q.contains("ORDER BY n.id"));
    }

    #[test]
    fn test_find_nodes_one_placeholder_per_key() {
        let q = find_nodes(&["ports", "meta", "os"], false);
        for (index, key) in ["ports", "meta", "os"].iter().enumerate() {
            assert!(q.contains(&format!("n.`{key}` = $filter_{index}")));
        }
        assert!(!q.contains("$filter_3"));
    }

    #[test]
    fn test_paths_filters_and_reduces_cost() {
        let q = paths(Some(&["A".to_string(), "B".to_string()]), 2);
        assert!(q.contains("-[:`A`|`B`*1..2]->(finish {id: $end_id})"));
        assert!(q.contains(
            "reduce(cost = 0.0, rel IN relationships(p) | cost + (1.0 - rel.weight * rel.confidence)) AS cost"
        ));
        assert!(q.contains("x.deleted_at IS NULL"));
        assert!(q.contains("LIMIT $limit"));
    }

    #[test]
    fn test_update_node_merge_and_replace() {
        let merge = update_node(true);
        assert!(merge.contains("SET n += $props"));

        let replace = update_node(false);
        assert!(replace.contains("SET n = $props"));
        assert!(replace.contains("n.created_at = created"));
        assert!(replace.contains("n.id = $id"));
    }

    #[test]
    fn test_update_edge_replace_keeps_weight() {
        let replace = update_edge(false);
        assert!(replace.contains("SET r = $props"));
        assert!(replace.contains("r.weight = weight, r.confidence = confidence"));
    }

    #[test]
    fn test_soft_delete_node_cascades() {
        let q = soft_delete_node();
        assert!(q.contains("OPTIONAL MATCH (n)-[r]-()"));
        assert!(q.contains("FOREACH"));
    }

    #[test]
    fn test_create_node_escapes_labels() {
        let q = create_node(&["Host".to_string(), "Bad`Label".to_string()]);
        assert!(q.starts_with("CREATE (n:`Host`:`Bad``Label`)"));
        assert!(q.contains("n.id = $id"));
    }

    #[test]
    fn test_neighbors_direction() {
        let q = neighbors(Direction::Incoming, Some(&["T".to_string()]), true);
        assert!(q.contains("(start {id: $id})<-[r:`T`]-(n)"));
        assert!(q.contains("WITH DISTINCT n"));
        assert!(q.contains("LIMIT $limit"));
    }

    #[test]
    fn test_create_edges_escapes_type() {
        let q = create_edges("RELATES`TO");
        assert!(q.contains("[r:`RELATES``TO`]"));
        assert!(q.starts_with("UNWIND $rows AS row"));
    }

    #[test]
    fn test_json_to_bolt_scalars() {
        assert!(matches!(json_to_bolt(&json!(null)), BoltType::Null(_)));
        assert!(matches!(json_to_bolt(&json!(true)), BoltType::Boolean(_)));
        assert!(matches!(json_to_bolt(&json!(42)), BoltType::Integer(_)));
        assert!(matches!(json_to_bolt(&json!(1.5)), BoltType::Float(_)));
        assert!(matches!(json_to_bolt(&json!("x")), BoltType::String(_)));
    }

    #[test]
    fn test_json_to_bolt_nested() {
        match json_to_bolt(&json!({"tags": ["a", "b"], "nested": {"k": 1}})) {
            BoltType::Map(map) => {
                assert_eq!(map.value.len(), 2);
                assert!(matches!(
                    map.value.get(&BoltString::from("tags")),
                    Some(BoltType::List(list)) if list.value.len() == 2
                ));
            },
            other => panic!("expected map, got {other:?}"),
        }
    }

    #[test]
    fn test_optional_lists() {
        assert!(matches!(optional_string_list(None), BoltType::Null(_)));
        assert!(matches!(optional_string_list(Some(&[])), BoltType::Null(_)));
        assert!(matches!(
            optional_string_list(Some(&["A".to_string()])),
            BoltType::List(_)
        ));
    }

    #[test]
    fn test_node_record_strips_system_keys() {
        let record: NodeRecord = serde_json::from_value(json!({
            "id": "n1",
            "labels": ["Host"],
            "props": {"id": "n1", "created_at": 1, "updated_at": 2, "name": "web"}
        }))
        .unwrap();
        let node = record.into_node();
        assert_eq!(node.id.as_str(), "n1");
        assert_eq!(node.properties.len(), 1);
        assert_eq!(node.properties["name"], json!("web"));
    }

    #[test]
    fn test_edge_record_lifts_weight() {
        let record: EdgeRecord = serde_json::from_value(json!({
            "id": "e1",
            "type": "USES",
            "source": "a",
            "target": "b",
            "props": {"id": "e1", "weight": 0.5, "confidence": 0.8, "port": 22}
        }))
        .unwrap();
        let edge = record.into_edge();
        assert!((edge.weight - 0.5).abs() < f64::EPSILON);
        assert!((edge.confidence - 0.8).abs() < f64::EPSILON);
        assert_eq!(edge.properties.len(), 1);
        assert_eq!(edge.edge_type, "USES");
    }
}
