//! Contract tests against the in-memory backend.
//!
//! The same scenarios run against `PostgreSQL` and Memgraph in their own
//! env-gated integration files.

// Integration tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

mod common;

use futures::future::join_all;
use intelgraph::storage::InMemoryGraphBackend;
use intelgraph::{
    BackendParams, BackendType, EdgeSpec, Error, GraphBackend, GraphBackendFactory, NodeId,
    NodeSpec, Properties, TraversalParams,
};
use proptest::prelude::*;
use std::sync::Arc;

async fn connected() -> InMemoryGraphBackend {
    let backend = InMemoryGraphBackend::new();
    backend.connect().await.unwrap();
    backend
}

#[tokio::test]
async fn test_round_trip() {
    common::round_trip(&connected().await).await;
}

#[tokio::test]
async fn test_merge_and_replace() {
    common::merge_and_replace(&connected().await).await;
}

#[tokio::test]
async fn test_chain_traversal() {
    common::chain_traversal(&connected().await).await;
}

#[tokio::test]
async fn test_ten_node_chain() {
    common::ten_node_chain(&connected().await).await;
}

#[tokio::test]
async fn test_cycle_safety() {
    common::cycle_safety(&connected().await).await;
}

#[tokio::test]
async fn test_shortest_path_tie_break() {
    common::shortest_path_tie_break(&connected().await).await;
}

#[tokio::test]
async fn test_subgraph_extraction() {
    common::subgraph_extraction(&connected().await).await;
}

#[tokio::test]
async fn test_boundaries() {
    common::boundaries(&connected().await).await;
}

#[tokio::test]
async fn test_batch_and_queries() {
    common::batch_and_queries(&connected().await).await;
}

#[tokio::test]
async fn test_exact_property_filters() {
    common::exact_property_filters(&connected().await).await;
}

#[tokio::test]
async fn test_parity_graph_is_deterministic() {
    let first = connected().await;
    let second = connected().await;
    common::build_parity_graph(&first).await;
    common::build_parity_graph(&second).await;

    let left = common::parity_snapshot(&first).await;
    let right = common::parity_snapshot(&second).await;
    assert_eq!(left.0, 100);
    assert_eq!(left.1, 200);
    common::assert_parity(left, right);
}

#[tokio::test]
async fn test_batch_chunks_beyond_chunk_size() {
    let backend = connected().await;
    let count = intelgraph::storage::BATCH_CHUNK_SIZE + 5;
    let specs = (0..count).map(|i| NodeSpec::new(["Bulk"]).with_id(format!("b{i}"))).collect();
    let nodes = backend.batch_create_nodes(specs).await.unwrap();
    assert_eq!(nodes.len(), count);
    assert_eq!(backend.count_nodes(Some(&["Bulk".to_string()])).await.unwrap(), count);
}

#[tokio::test]
async fn test_factory_backend_through_trait_object() {
    let backend: Arc<dyn GraphBackend> =
        GraphBackendFactory::create(BackendType::InMemory, BackendParams::new()).unwrap();
    assert!(matches!(
        backend.count_nodes(None).await,
        Err(Error::NotConnected { backend: "memory" })
    ));
    backend.connect().await.unwrap();
    common::chain_traversal(backend.as_ref()).await;
    backend.disconnect().await.unwrap();
    assert!(!backend.is_connected());
}

#[tokio::test]
async fn test_concurrent_writers_share_backend() {
    let backend: Arc<dyn GraphBackend> = Arc::new(connected().await);
    let writes = (0..32).map(|i| {
        let backend = Arc::clone(&backend);
        async move {
            backend
                .create_node(&["Worker".to_string()], Properties::new(), Some(NodeId::new(format!("w{i}"))))
                .await
        }
    });
    let results = join_all(writes).await;
    assert!(results.iter().all(Result::is_ok));
    assert_eq!(backend.count_nodes(None).await.unwrap(), 32);
}

#[tokio::test]
async fn test_soft_deleted_node_blocks_traversal() {
    let backend = connected().await;
    for id in ["A", "B", "C"] {
        common::node(&backend, id, "Step").await;
    }
    common::edge(&backend, "A", "B", "NEXT").await;
    common::edge(&backend, "B", "C", "NEXT").await;
    assert!(backend.delete_node(&NodeId::new("B"), true).await.unwrap());

    let reached = backend
        .traverse(&NodeId::new("A"), &TraversalParams::new(3).unwrap())
        .await
        .unwrap();
    assert!(reached.is_empty());
    let err = backend
        .create_edge(EdgeSpec::new("A", "B", "NEXT"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

proptest! {
    #[test]
    fn prop_traversal_depths_are_bounded(max_depth in 1_u32..6, edges in prop::collection::vec((0_usize..8, 0_usize..8), 0..24)) {
        tokio_test::block_on(async {
            let backend = connected().await;
            let specs = (0..8).map(|i| NodeSpec::new(["P"]).with_id(format!("p{i}"))).collect();
            backend.batch_create_nodes(specs).await.unwrap();
            let specs: Vec<EdgeSpec> = edges
                .iter()
                .map(|(s, t)| EdgeSpec::new(format!("p{s}"), format!("p{t}"), "E"))
                .collect();
            backend.batch_create_edges(specs).await.unwrap();

            let reached = backend
                .traverse(&NodeId::new("p0"), &TraversalParams::new(max_depth).unwrap())
                .await
                .unwrap();
            let mut seen = std::collections::HashSet::new();
            for node in &reached {
                let depth = node.depth.unwrap();
                prop_assert!(depth >= 1 && depth <= max_depth);
                prop_assert!(node.id.as_str() != "p0");
                prop_assert!(seen.insert(node.id.clone()));
                let path = node.path.as_ref().unwrap();
                prop_assert_eq!(path.len(), depth as usize + 1);
            }
            Ok::<(), TestCaseError>(())
        })?;
    }
}
