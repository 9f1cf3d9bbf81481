//! In-process fake storage nodes and a wired-up `Gateway` for pipeline
//! integration tests (spec §6 storage-node HTTP contract).

#![cfg(test)]

use crate::gateway::Gateway;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use objectio_common::{GatewayConfig, NodeId};
use objectio_erasure::ErasureCodec;
use objectio_meta_store::MetaStore;
use objectio_placement::{NodeEntry, NodeRegistry};
use objectio_transport::ShardTransport;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

type NodeStore = Arc<Mutex<HashMap<(String, String), Vec<u8>>>>;

async fn health_handler() -> StatusCode {
    StatusCode::OK
}

async fn put_handler(
    State(store): State<NodeStore>,
    Path((bucket, shard_key)): Path<(String, String)>,
    body: axum::body::Bytes,
) -> StatusCode {
    store
        .lock()
        .unwrap()
        .insert((bucket, shard_key), body.to_vec());
    StatusCode::OK
}

async fn get_handler(
    State(store): State<NodeStore>,
    Path((bucket, shard_key)): Path<(String, String)>,
) -> Result<Vec<u8>, StatusCode> {
    store
        .lock()
        .unwrap()
        .get(&(bucket, shard_key))
        .cloned()
        .ok_or(StatusCode::NOT_FOUND)
}

async fn delete_handler(
    State(store): State<NodeStore>,
    Path((bucket, shard_key)): Path<(String, String)>,
) -> StatusCode {
    store.lock().unwrap().remove(&(bucket, shard_key));
    StatusCode::OK
}

async fn always_fail() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

/// Spawn one healthy fake storage node; returns its `NodeEntry`.
async fn spawn_healthy_node(id: &str) -> NodeEntry {
    let store: NodeStore = Arc::new(Mutex::new(HashMap::new()));
    let app = Router::new()
        .route("/internal/health", get(health_handler))
        .route(
            "/internal/objects/{bucket}/{*shard_key}",
            get(get_handler).put(put_handler).delete(delete_handler),
        )
        .with_state(store);
    spawn_app(id, app).await
}

/// Spawn a node that accepts GET/health but always fails writes.
async fn spawn_broken_node(id: &str) -> NodeEntry {
    let app = Router::new()
        .route("/internal/health", get(health_handler))
        .route(
            "/internal/objects/{bucket}/{*shard_key}",
            axum::routing::put(always_fail)
                .get(always_fail)
                .delete(always_fail),
        );
    spawn_app(id, app).await
}

async fn spawn_app(id: &str, app: Router) -> NodeEntry {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    NodeEntry {
        node_id: NodeId::new(id),
        base_url: format!("http://{addr}"),
    }
}

/// A gateway wired to `count` healthy in-process fake storage nodes.
pub async fn test_gateway(count: usize) -> (Gateway, Vec<NodeEntry>) {
    let mut nodes = Vec::with_capacity(count);
    for i in 0..count {
        nodes.push(spawn_healthy_node(&format!("n{i}")).await);
    }
    build_gateway(nodes).await
}

pub mod fake_storage_node {
    use super::{build_gateway, spawn_broken_node, spawn_healthy_node};
    use crate::gateway::Gateway;
    use objectio_placement::NodeEntry;

    /// `total` nodes total, only the first `healthy_count` actually
    /// persist writes — the rest fail every PUT.
    pub async fn broken_fleet(total: usize, healthy_count: usize) -> (Gateway, Vec<NodeEntry>) {
        let mut nodes = Vec::with_capacity(total);
        for i in 0..healthy_count {
            nodes.push(spawn_healthy_node(&format!("n{i}")).await);
        }
        for i in healthy_count..total {
            nodes.push(spawn_broken_node(&format!("n{i}")).await);
        }
        build_gateway(nodes).await
    }
}

async fn build_gateway(nodes: Vec<NodeEntry>) -> (Gateway, Vec<NodeEntry>) {
    let regions = HashMap::new();
    let registry = NodeRegistry::new(nodes.clone(), regions);
    let codec = ErasureCodec::standard().unwrap();
    let transport = ShardTransport::new();
    let dir = tempfile::tempdir().unwrap();
    let meta = MetaStore::open(dir.into_path().join("meta.redb")).unwrap();
    let config = GatewayConfig::default();
    (
        Gateway::new(meta, registry, codec, transport, config),
        nodes,
    )
}
