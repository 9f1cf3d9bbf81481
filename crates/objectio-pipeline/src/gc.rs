//! Garbage collection of superseded versions (spec §4.10, C10).
//!
//! Safe against concurrent writes: it only ever touches `is_latest =
//! false` rows and uses the same refcount discipline as delete, so it
//! never removes shards while a `ContentRow`'s refcount stays positive.

use crate::gateway::Gateway;
use objectio_common::{NodeId, Result};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Debug, Default, Clone, Copy)]
pub struct GcReport {
    pub versions_collected: usize,
    pub content_rows_freed: usize,
    pub shards_deleted: usize,
}

pub async fn run_gc_once(gateway: &Gateway, now: u64, retention_seconds: u64) -> Result<GcReport> {
    let cutoff = now.saturating_sub(retention_seconds);
    let stale = gateway.meta.list_stale_versions(cutoff)?;

    let mut report = GcReport::default();
    for version in stale {
        let freed = gateway.meta.delete_stale_version_and_decr_refcount(
            &version.bucket,
            &version.key,
            &version.version_id,
            &version.content_hash,
        )?;
        report.versions_collected += 1;

        if let Some(shard_layout) = freed {
            report.content_rows_freed += 1;
            for loc in shard_layout {
                let Some(node) = gateway.registry.get(&NodeId::new(loc.node_id.clone())) else {
                    continue;
                };
                match gateway
                    .transport
                    .delete(node, &version.bucket, &loc.shard_key)
                    .await
                {
                    Ok(()) => report.shards_deleted += 1,
                    Err(e) => warn!(
                        node_id = %loc.node_id,
                        shard_key = %loc.shard_key,
                        error = %e,
                        "gc: shard delete failed"
                    ),
                }
            }
        }
    }

    info!(
        versions_collected = report.versions_collected,
        content_rows_freed = report.content_rows_freed,
        shards_deleted = report.shards_deleted,
        "gc pass complete"
    );
    Ok(report)
}

/// Spawn the periodic GC loop (default hourly, spec §6 `GC_INTERVAL_HOURS`).
pub fn spawn_gc_loop(
    gateway: Gateway,
    interval: Duration,
    retention_seconds: u64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let now = crate::health::now_unix();
            if let Err(e) = run_gc_once(&gateway, now, retention_seconds).await {
                warn!(error = %e, "gc pass failed");
            }
        }
    })
}
