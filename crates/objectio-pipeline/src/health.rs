//! In-memory node health tracking (spec §3 `NodeHealth`, §4.8).

use dashmap::DashMap;
use objectio_common::NodeId;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    Healthy,
    Unhealthy,
    Unknown,
}

#[derive(Debug, Clone)]
pub struct NodeHealthRecord {
    pub status: NodeStatus,
    pub last_probe_time: u64,
    pub last_rtt_ms: Option<u64>,
    pub last_error: Option<String>,
}

impl Default for NodeHealthRecord {
    fn default() -> Self {
        Self {
            status: NodeStatus::Unknown,
            last_probe_time: 0,
            last_rtt_ms: None,
            last_error: None,
        }
    }
}

/// Read mostly everywhere, written only by the health monitor loop
/// (spec §5 "Shared resources").
#[derive(Default)]
pub struct HealthMap(DashMap<NodeId, NodeHealthRecord>);

impl HealthMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, node_id: &NodeId) -> NodeHealthRecord {
        self.0.get(node_id).map_or_else(NodeHealthRecord::default, |r| r.clone())
    }

    pub fn record_healthy(&self, node_id: &NodeId, rtt_ms: u64, now: u64) {
        self.0.insert(
            node_id.clone(),
            NodeHealthRecord {
                status: NodeStatus::Healthy,
                last_probe_time: now,
                last_rtt_ms: Some(rtt_ms),
                last_error: None,
            },
        );
    }

    pub fn record_unhealthy(&self, node_id: &NodeId, error: String, now: u64) {
        self.0.insert(
            node_id.clone(),
            NodeHealthRecord {
                status: NodeStatus::Unhealthy,
                last_probe_time: now,
                last_rtt_ms: None,
                last_error: Some(error),
            },
        );
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<(NodeId, NodeHealthRecord)> {
        self.0
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }
}

#[must_use]
pub fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
