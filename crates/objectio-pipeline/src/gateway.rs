//! Ties the codec, registry, transport, and metadata store together
//! behind one handle the HTTP surface and background loops share
//! (spec §4.11 "Gateway API" construction sequence).

use crate::health::HealthMap;
use dashmap::DashMap;
use objectio_common::GatewayConfig;
use objectio_erasure::ErasureCodec;
use objectio_meta_store::MetaStore;
use objectio_placement::NodeRegistry;
use objectio_transport::ShardTransport;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared dependencies for the write/read/delete pipelines, the quota
/// gate, the health monitor, and the GC loop.
#[derive(Clone)]
pub struct Gateway {
    pub meta: Arc<MetaStore>,
    pub registry: Arc<NodeRegistry>,
    pub codec: Arc<ErasureCodec>,
    pub transport: Arc<ShardTransport>,
    pub health: Arc<HealthMap>,
    pub config: Arc<GatewayConfig>,
    bucket_locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl Gateway {
    #[must_use]
    pub fn new(
        meta: MetaStore,
        registry: NodeRegistry,
        codec: ErasureCodec,
        transport: ShardTransport,
        config: GatewayConfig,
    ) -> Self {
        Self {
            meta: Arc::new(meta),
            registry: Arc::new(registry),
            codec: Arc::new(codec),
            transport: Arc::new(transport),
            health: Arc::new(HealthMap::new()),
            config: Arc::new(config),
            bucket_locks: Arc::new(DashMap::new()),
        }
    }

    /// Advisory lock serializing the quota-check-through-commit span
    /// of writes to one bucket (spec §4.7).
    pub fn bucket_lock(&self, bucket: &str) -> Arc<Mutex<()>> {
        self.bucket_locks
            .entry(bucket.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
