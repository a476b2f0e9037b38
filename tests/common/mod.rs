//! Behavioral scenarios shared by every backend's integration tests.
//!
//! Each scenario takes a connected backend and assumes it starts empty.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    dead_code,
    missing_docs
)]

use intelgraph::{
    Direction, Edge, EdgeSpec, GraphBackend, Node, NodeId, NodeSpec, Path, Properties,
    TraversalParams,
};
use serde_json::{Value, json};

pub fn props(value: Value) -> Properties {
    match value {
        Value::Object(map) => map,
        _ => Properties::new(),
    }
}

pub fn labels(names: &[&str]) -> Vec<String> {
    names.iter().map(ToString::to_string).collect()
}

pub async fn node(backend: &dyn GraphBackend, id: &str, label: &str) -> Node {
    backend
        .create_node(&labels(&[label]), Properties::new(), Some(NodeId::new(id)))
        .await
        .unwrap()
}

pub async fn edge(backend: &dyn GraphBackend, source: &str, target: &str, edge_type: &str) -> Edge {
    backend
        .create_edge(EdgeSpec::new(source, target, edge_type))
        .await
        .unwrap()
}

pub fn ids(nodes: &[Node]) -> Vec<&str> {
    nodes.iter().map(|n| n.id.as_str()).collect()
}

pub fn assert_path_invariant(path: &Path) {
    assert_eq!(path.nodes.len(), path.edges.len() + 1);
    assert_eq!(path.length, path.edges.len());
    for (index, edge) in path.edges.iter().enumerate() {
        assert_eq!(edge.source_id, path.nodes[index].id);
        assert_eq!(edge.target_id, path.nodes[index + 1].id);
    }
}

// ============================================================================
// Scenarios
// ============================================================================

pub async fn round_trip(backend: &dyn GraphBackend) {
    let created = backend
        .create_node(
            &labels(&["Host", "Asset"]),
            props(json!({"name": "web-1", "port": 443, "tags": ["dmz"], "score": 0.5})),
            None,
        )
        .await
        .unwrap();
    let fetched = backend.get_node(&created.id).await.unwrap().unwrap();
    assert_eq!(fetched, created);
    assert_eq!(fetched.primary_label(), Some("Host"));

    let edge_target = node(backend, "db-1", "Host").await;
    let edge = backend
        .create_edge(
            EdgeSpec::new(created.id.clone(), edge_target.id.clone(), "CONNECTS_TO")
                .with_weight(0.25)
                .with_confidence(0.75)
                .with_properties(props(json!({"protocol": "tcp"}))),
        )
        .await
        .unwrap();
    let fetched_edge = backend.get_edge(&edge.id).await.unwrap().unwrap();
    assert_eq!(fetched_edge, edge);

    assert!(backend.get_node(&NodeId::new("absent")).await.unwrap().is_none());
}

pub async fn merge_and_replace(backend: &dyn GraphBackend) {
    let node = backend
        .create_node(&labels(&["Person"]), props(json!({"name": "Ada", "age": 36})), None)
        .await
        .unwrap();

    let merged = backend
        .update_node(&node.id, props(json!({"age": 37, "city": "London"})), true)
        .await
        .unwrap();
    assert_eq!(merged.properties, props(json!({"name": "Ada", "age": 37, "city": "London"})));

    let replaced = backend
        .update_node(&node.id, props(json!({"nickname": "Countess"})), false)
        .await
        .unwrap();
    assert_eq!(replaced.properties, props(json!({"nickname": "Countess"})));
    let fetched = backend.get_node(&node.id).await.unwrap().unwrap();
    assert_eq!(fetched.properties, replaced.properties);

    let err = backend
        .update_node(&NodeId::new("ghost"), Properties::new(), true)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

/// A -> B -> C -> D.
pub async fn chain_traversal(backend: &dyn GraphBackend) {
    for id in ["A", "B", "C", "D"] {
        node(backend, id, "Step").await;
    }
    edge(backend, "A", "B", "NEXT").await;
    edge(backend, "B", "C", "NEXT").await;
    edge(backend, "C", "D", "NEXT").await;

    let reached = backend
        .traverse(&NodeId::new("A"), &TraversalParams::new(2).unwrap())
        .await
        .unwrap();
    assert_eq!(ids(&reached), vec!["B", "C"]);
    assert_eq!(reached[0].depth, Some(1));
    assert_eq!(reached[1].depth, Some(2));
    assert_eq!(
        reached[1].path.as_deref(),
        Some(&[NodeId::new("A"), NodeId::new("B"), NodeId::new("C")][..])
    );

    let upstream = backend
        .traverse(
            &NodeId::new("D"),
            &TraversalParams::new(5).unwrap().with_direction(Direction::Incoming),
        )
        .await
        .unwrap();
    assert_eq!(ids(&upstream), vec!["C", "B", "A"]);

    let path = backend
        .find_shortest_path(&NodeId::new("A"), &NodeId::new("D"), 5, None)
        .await
        .unwrap()
        .unwrap();
    assert_path_invariant(&path);
    assert_eq!(path.length, 3);

    assert!(
        backend
            .find_shortest_path(&NodeId::new("A"), &NodeId::new("D"), 2, None)
            .await
            .unwrap()
            .is_none()
    );
    assert!(
        backend
            .find_shortest_path(&NodeId::new("D"), &NodeId::new("A"), 5, None)
            .await
            .unwrap()
            .is_none()
    );
}

/// n0 -> n1 -> ... -> n9, traversed three hops from n0.
pub async fn ten_node_chain(backend: &dyn GraphBackend) {
    let specs = (0..10).map(|i| NodeSpec::new(["Step"]).with_id(format!("n{i}"))).collect();
    backend.batch_create_nodes(specs).await.unwrap();
    let edges = (0..9)
        .map(|i| EdgeSpec::new(format!("n{i}"), format!("n{}", i + 1), "NEXT"))
        .collect();
    backend.batch_create_edges(edges).await.unwrap();

    let reached = backend
        .traverse(&NodeId::new("n0"), &TraversalParams::new(3).unwrap())
        .await
        .unwrap();
    assert_eq!(ids(&reached), vec!["n1", "n2", "n3"]);
    let depths: Vec<Option<u32>> = reached.iter().map(|n| n.depth).collect();
    assert_eq!(depths, vec![Some(1), Some(2), Some(3)]);
    assert_eq!(
        reached[2].path.as_deref(),
        Some(&[NodeId::new("n0"), NodeId::new("n1"), NodeId::new("n2"), NodeId::new("n3")][..])
    );
}

/// A -> B -> C -> A.
pub async fn cycle_safety(backend: &dyn GraphBackend) {
    for id in ["A", "B", "C"] {
        node(backend, id, "Loop").await;
    }
    edge(backend, "A", "B", "NEXT").await;
    edge(backend, "B", "C", "NEXT").await;
    edge(backend, "C", "A", "NEXT").await;

    let reached = backend
        .traverse(&NodeId::new("A"), &TraversalParams::new(5).unwrap())
        .await
        .unwrap();
    assert_eq!(ids(&reached), vec!["B", "C"]);

    let both = backend
        .traverse(
            &NodeId::new("A"),
            &TraversalParams::new(5).unwrap().with_direction(Direction::Both),
        )
        .await
        .unwrap();
    assert_eq!(ids(&both), vec!["B", "C"]);
    assert!(both.iter().all(|n| n.depth == Some(1)));

    let paths = backend
        .find_all_paths(&NodeId::new("A"), &NodeId::new("C"), 5, 10)
        .await
        .unwrap();
    assert_eq!(paths.len(), 1);
    assert_path_invariant(&paths[0]);
}

/// Two equal-length routes A->B->D and A->C->D; the stronger one wins.
pub async fn shortest_path_tie_break(backend: &dyn GraphBackend) {
    for id in ["A", "B", "C", "D", "E"] {
        node(backend, id, "Hop").await;
    }
    edge(backend, "A", "B", "ROUTE").await;
    edge(backend, "B", "D", "ROUTE").await;
    for (source, target) in [("A", "C"), ("C", "D")] {
        backend
            .create_edge(EdgeSpec::new(source, target, "ROUTE").with_weight(0.5))
            .await
            .unwrap();
    }
    edge(backend, "A", "E", "DIRECT").await;

    let best = backend
        .find_shortest_path(&NodeId::new("A"), &NodeId::new("D"), 4, None)
        .await
        .unwrap()
        .unwrap();
    assert_path_invariant(&best);
    let route: Vec<&str> = best.node_ids().into_iter().map(NodeId::as_str).collect();
    assert_eq!(route, vec!["A", "B", "D"]);
    assert!(best.total_weight.abs() < 1e-9);

    let all = backend
        .find_all_paths(&NodeId::new("A"), &NodeId::new("D"), 4, 10)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
    assert!((all[1].total_weight - 1.0).abs() < 1e-9);

    let direct = backend
        .find_shortest_path(&NodeId::new("A"), &NodeId::new("E"), 3, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(direct.length, 1);

    let filtered = backend
        .find_shortest_path(&NodeId::new("A"), &NodeId::new("D"), 4, Some(&labels(&["DIRECT"])))
        .await
        .unwrap();
    assert!(filtered.is_none());

    let itself = backend
        .find_shortest_path(&NodeId::new("A"), &NodeId::new("A"), 3, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(itself.length, 0);
    assert_eq!(itself.nodes.len(), 1);
}

pub async fn subgraph_extraction(backend: &dyn GraphBackend) {
    for id in ["A", "B", "C", "D"] {
        node(backend, id, "Part").await;
    }
    edge(backend, "A", "B", "LINK").await;
    edge(backend, "B", "C", "LINK").await;
    edge(backend, "C", "D", "LINK").await;

    let requested = [NodeId::new("A"), NodeId::new("B"), NodeId::new("C"), NodeId::new("zzz")];
    let subgraph = backend.get_subgraph(&requested, true).await.unwrap();
    assert_eq!(ids(&subgraph.nodes), vec!["A", "B", "C"]);
    assert_eq!(subgraph.edges.len(), 2);
    assert!(subgraph.edges.iter().all(|e| e.target_id.as_str() != "D"));

    let bare = backend.get_subgraph(&requested, false).await.unwrap();
    assert_eq!(bare.nodes.len(), 3);
    assert!(bare.edges.is_empty());

    let neighbors = backend
        .get_neighbors(&NodeId::new("B"), Direction::Both, None, None)
        .await
        .unwrap();
    assert_eq!(ids(&neighbors), vec!["A", "C"]);
}

pub async fn boundaries(backend: &dyn GraphBackend) {
    assert!(TraversalParams::new(0).is_err());
    let err = backend
        .find_shortest_path(&NodeId::new("a"), &NodeId::new("b"), 0, None)
        .await
        .unwrap_err();
    assert!(err.is_validation());

    let err = backend
        .create_node(&[], Properties::new(), None)
        .await
        .unwrap_err();
    assert!(err.is_validation());

    node(backend, "x", "Thing").await;
    node(backend, "y", "Thing").await;
    let err = backend
        .create_edge(EdgeSpec::new("x", "y", "REL").with_weight(1.5))
        .await
        .unwrap_err();
    assert!(err.is_validation());
    let err = backend
        .create_edge(EdgeSpec::new("x", "nowhere", "REL"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let edge = edge(backend, "x", "y", "REL").await;
    assert!(backend.delete_node(&NodeId::new("y"), true).await.unwrap());
    assert!(!backend.delete_node(&NodeId::new("y"), true).await.unwrap());
    assert!(backend.get_node(&NodeId::new("y")).await.unwrap().is_none());
    assert!(backend.get_edge(&edge.id).await.unwrap().is_none());

    assert!(backend.delete_node(&NodeId::new("x"), false).await.unwrap());
    assert!(!backend.delete_node(&NodeId::new("x"), false).await.unwrap());

    assert!(backend.batch_create_nodes(Vec::new()).await.unwrap().is_empty());
    assert!(backend.batch_create_edges(Vec::new()).await.unwrap().is_empty());
}

pub async fn batch_and_queries(backend: &dyn GraphBackend) {
    let nodes = backend
        .batch_create_nodes(vec![
            NodeSpec::new(["Host"]).with_id("h1").with_properties(props(json!({"os": "linux"}))),
            NodeSpec::new(["Host"]).with_id("h2").with_properties(props(json!({"os": "bsd"}))),
            NodeSpec::new(["User", "Admin"]).with_id("u1"),
        ])
        .await
        .unwrap();
    assert_eq!(nodes.len(), 3);

    let err = backend
        .batch_create_edges(vec![
            EdgeSpec::new("u1", "h1", "LOGS_INTO"),
            EdgeSpec::new("u1", "h2", "").with_id("bad"),
        ])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("edge spec 1"));
    assert_eq!(backend.count_edges(None).await.unwrap(), 0);

    backend
        .batch_create_edges(vec![
            EdgeSpec::new("u1", "h1", "LOGS_INTO"),
            EdgeSpec::new("u1", "h2", "LOGS_INTO"),
            EdgeSpec::new("h1", "h2", "TALKS_TO"),
        ])
        .await
        .unwrap();

    assert_eq!(backend.count_nodes(None).await.unwrap(), 3);
    assert_eq!(backend.count_nodes(Some(&labels(&["Admin"]))).await.unwrap(), 1);
    assert_eq!(backend.count_edges(Some(&labels(&["LOGS_INTO"]))).await.unwrap(), 2);

    let linux = backend
        .find_nodes(Some(&labels(&["Host"])), Some(&props(json!({"os": "linux"}))), None)
        .await
        .unwrap();
    assert_eq!(ids(&linux), vec!["h1"]);

    let from_user = backend
        .find_edges(None, Some(&NodeId::new("u1")), None, Some(1))
        .await
        .unwrap();
    assert_eq!(from_user.len(), 1);

    let stats = backend.get_stats().await.unwrap();
    assert_eq!(stats.node_count, 3);
    assert_eq!(stats.edge_count, 3);
    assert_eq!(stats.nodes_by_label.get("Host"), Some(&2));
    assert_eq!(stats.nodes_by_label.get("User"), Some(&1));
    assert_eq!(stats.edges_by_type.get("TALKS_TO"), Some(&1));

    backend.clear().await.unwrap();
    assert_eq!(backend.count_nodes(None).await.unwrap(), 0);
}

/// Property filters compare whole values, so a list or map filter never
/// matches a stored superset.
pub async fn exact_property_filters(backend: &dyn GraphBackend) {
    backend
        .batch_create_nodes(vec![
            NodeSpec::new(["Host"])
                .with_id("web")
                .with_properties(props(json!({"ports": [80, 443], "meta": {"x": 1, "y": 2}}))),
            NodeSpec::new(["Host"])
                .with_id("edge")
                .with_properties(props(json!({"ports": [80], "meta": {"x": 1}}))),
        ])
        .await
        .unwrap();

    let by_ports = backend
        .find_nodes(None, Some(&props(json!({"ports": [80]}))), None)
        .await
        .unwrap();
    assert_eq!(ids(&by_ports), vec!["edge"]);

    let by_meta = backend
        .find_nodes(None, Some(&props(json!({"meta": {"x": 1}}))), None)
        .await
        .unwrap();
    assert_eq!(ids(&by_meta), vec!["edge"]);

    let full = backend
        .find_nodes(
            Some(&labels(&["Host"])),
            Some(&props(json!({"ports": [80, 443], "meta": {"x": 1, "y": 2}}))),
            None,
        )
        .await
        .unwrap();
    assert_eq!(ids(&full), vec!["web"]);

    let missing_key = backend
        .find_nodes(None, Some(&props(json!({"ports": [80], "owner": "ops"}))), None)
        .await
        .unwrap();
    assert!(missing_key.is_empty());
}

/// Builds the 100-node / 200-edge parity graph.
pub async fn build_parity_graph(backend: &dyn GraphBackend) {
    let specs = (0..100)
        .map(|i| NodeSpec::new(["Node"]).with_id(format!("n{i}")).with_properties(props(json!({"index": i}))))
        .collect();
    backend.batch_create_nodes(specs).await.unwrap();

    let edges = (0..100_usize)
        .flat_map(|i| {
            [
                EdgeSpec::new(format!("n{i}"), format!("n{}", (i * 7 + 1) % 100), "LINKS"),
                EdgeSpec::new(format!("n{i}"), format!("n{}", (i * 13 + 5) % 100), "REFS"),
            ]
        })
        .collect();
    backend.batch_create_edges(edges).await.unwrap();
}

/// Counts and depth-3 traversal size from `n0`.
pub async fn parity_snapshot(backend: &dyn GraphBackend) -> (usize, usize, usize) {
    let reached = backend
        .traverse(&NodeId::new("n0"), &TraversalParams::new(3).unwrap())
        .await
        .unwrap();
    (
        backend.count_nodes(None).await.unwrap(),
        backend.count_edges(None).await.unwrap(),
        reached.len(),
    )
}

/// Asserts two backends built the same parity graph consistently.
pub fn assert_parity(left: (usize, usize, usize), right: (usize, usize, usize)) {
    assert_eq!(left.0, right.0);
    assert_eq!(left.1, right.1);
    assert!(left.2 >= 1 && right.2 >= 1);
    let (small, large) = if left.2 < right.2 { (left.2, right.2) } else { (right.2, left.2) };
    assert!(large <= small * 3);
}
