//! Periodic node health probing (spec §4.8, C3).
//!
//! Advisory only: read by admin endpoints and may inform placement, but
//! the write pipeline never consults it — quorum is the real safety net.

use crate::gateway::Gateway;
use crate::health::now_unix;
use futures::future::join_all;
use std::time::Duration;
use tokio::task::JoinHandle;

pub async fn probe_all_nodes(gateway: &Gateway) {
    let now = now_unix();
    let probes = gateway.registry.all_nodes().iter().map(|node| {
        let transport = gateway.transport.clone();
        let health = gateway.health.clone();
        let node = node.clone();
        async move {
            match transport.health(&node).await {
                Ok(rtt) => {
                    health.record_healthy(&node.node_id, rtt.as_millis() as u64, now);
                }
                Err(e) => {
                    health.record_unhealthy(&node.node_id, e.to_string(), now);
                }
            }
        }
    });
    join_all(probes).await;
}

/// Spawn the periodic health monitor (default 30s, spec §6
/// `HEALTH_INTERVAL_SECONDS`).
pub fn spawn_health_loop(gateway: Gateway, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            probe_all_nodes(&gateway).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::Gateway;
    use crate::health::NodeStatus;
    use crate::test_support::test_gateway;
    use objectio_common::{GatewayConfig, NodeId};
    use objectio_erasure::ErasureCodec;
    use objectio_meta_store::MetaStore;
    use objectio_placement::{NodeEntry, NodeRegistry};
    use objectio_transport::ShardTransport;
    use std::collections::HashMap;

    #[tokio::test]
    async fn probe_marks_healthy_nodes() {
        let (gateway, nodes) = test_gateway(3).await;
        probe_all_nodes(&gateway).await;
        for node in &nodes {
            assert_eq!(gateway.health.get(&node.node_id).status, NodeStatus::Healthy);
        }
    }

    #[tokio::test]
    async fn probe_marks_unreachable_node_unhealthy() {
        let dead_node = NodeEntry {
            node_id: NodeId::new("ghost"),
            base_url: "http://127.0.0.1:1".to_string(),
        };
        let registry = NodeRegistry::new(vec![dead_node.clone()], HashMap::new());
        let dir = tempfile::tempdir().unwrap();
        let meta = MetaStore::open(dir.into_path().join("meta.redb")).unwrap();
        let gateway = Gateway::new(
            meta,
            registry,
            ErasureCodec::standard().unwrap(),
            ShardTransport::new(),
            GatewayConfig::default(),
        );

        probe_all_nodes(&gateway).await;
        assert_eq!(
            gateway.health.get(&dead_node.node_id).status,
            NodeStatus::Unhealthy
        );
    }
}
