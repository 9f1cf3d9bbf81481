//! ObjectIO Gateway
//!
//! HTTP gateway fronting the erasure-coded, content-addressed object
//! store: write/read/delete pipelines, quota gate, GC loop, and health
//! monitor (spec §4.11).

mod rate_limit;
mod routes;

use anyhow::{Context, Result};
use clap::Parser;
use objectio_common::config::{NodeRegistryConfig, QuotaDefaults};
use objectio_common::GatewayConfig;
use objectio_erasure::ErasureCodec;
use objectio_meta_store::MetaStore;
use objectio_placement::{NodeEntry, NodeRegistry};
use objectio_pipeline::{gc, monitor, Gateway};
use objectio_transport::ShardTransport;
use rate_limit::RateLimitLayer;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "objectio-gateway")]
#[command(about = "ObjectIO gateway: erasure-coded, content-addressed object storage")]
#[command(version)]
struct Args {
    /// Listen address for the gateway HTTP API.
    #[arg(long, env = "OBJECTIO_LISTEN", default_value = "0.0.0.0:8080")]
    listen: String,

    /// Storage nodes as `node_id:url,node_id:url,...` (spec §4.2).
    #[arg(long, env = "OBJECTIO_NODES")]
    nodes: String,

    /// Region groupings as `region:node_id,node_id;region:node_id,...`.
    #[arg(long, env = "OBJECTIO_REGIONS", default_value = "")]
    regions: String,

    /// Path to the redb metadata database.
    #[arg(long, env = "OBJECTIO_META_DB_PATH", default_value = "/var/lib/objectio/meta.redb")]
    meta_db_path: PathBuf,

    /// Version retention before GC collects a superseded version.
    #[arg(long, env = "RETENTION_DAYS", default_value = "7")]
    retention_days: u32,

    /// Health probe cadence, in seconds.
    #[arg(long, env = "HEALTH_INTERVAL_SECONDS", default_value = "30")]
    health_interval_seconds: u64,

    /// GC pass cadence, in hours.
    #[arg(long, env = "GC_INTERVAL_HOURS", default_value = "1")]
    gc_interval_hours: u64,

    /// Per-IP rate limit, requests per minute.
    #[arg(long, env = "RATE_LIMIT_RPM", default_value = "600")]
    rate_limit_rpm: u32,

    /// Default per-bucket byte quota when no explicit quota is set.
    #[arg(long, env = "DEFAULT_QUOTA_BYTES", default_value_t = 10 * 1024 * 1024 * 1024)]
    default_quota_bytes: u64,

    /// Default per-bucket object-count quota when no explicit quota is set.
    #[arg(long, env = "DEFAULT_QUOTA_OBJECTS", default_value = "10000")]
    default_quota_objects: u64,

    /// Log level (overridden by `RUST_LOG` if set).
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ObjectIO gateway");

    let node_pairs = NodeRegistryConfig::parse_nodes(&args.nodes).map_err(anyhow::Error::msg)?;
    if node_pairs.is_empty() {
        anyhow::bail!("--nodes must list at least one storage node");
    }
    let nodes: Vec<NodeEntry> = node_pairs
        .into_iter()
        .map(|(node_id, base_url)| NodeEntry {
            node_id: objectio_common::NodeId::new(node_id),
            base_url,
        })
        .collect();
    info!(node_count = nodes.len(), "loaded node registry");

    let region_pairs = NodeRegistryConfig::parse_regions(&args.regions).map_err(anyhow::Error::msg)?;
    let regions = region_pairs
        .into_iter()
        .map(|(region, ids)| {
            (
                region,
                ids.into_iter().map(objectio_common::NodeId::new).collect(),
            )
        })
        .collect();

    let registry = NodeRegistry::new(nodes, regions);

    if let Some(parent) = args.meta_db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating metadata directory {}", parent.display()))?;
    }
    let meta = MetaStore::open(&args.meta_db_path)
        .with_context(|| format!("opening metadata store at {}", args.meta_db_path.display()))?;

    let codec = ErasureCodec::standard().context("constructing erasure codec")?;
    let transport = ShardTransport::new();

    let mut config = GatewayConfig::default();
    config.network.listen = args
        .listen
        .parse()
        .with_context(|| format!("invalid listen address {}", args.listen))?;
    config.meta_store.db_path = args.meta_db_path.clone();
    config.versioning.retention_days = args.retention_days;
    config.versioning.health_interval_seconds = args.health_interval_seconds;
    config.versioning.gc_interval_hours = args.gc_interval_hours;
    config.rate_limit.requests_per_minute = args.rate_limit_rpm;
    config.default_quota = QuotaDefaults {
        max_size_bytes: args.default_quota_bytes,
        max_objects: args.default_quota_objects,
    };

    let gateway = Gateway::new(meta, registry, codec, transport, config.clone());

    let gc_handle = gc::spawn_gc_loop(
        gateway.clone(),
        Duration::from_secs(args.gc_interval_hours * 3600),
        u64::from(args.retention_days) * 24 * 3600,
    );
    let health_handle = monitor::spawn_health_loop(
        gateway.clone(),
        Duration::from_secs(args.health_interval_seconds),
    );

    let app = routes::router(gateway)
        .layer(RateLimitLayer::new(config.rate_limit.requests_per_minute))
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.network.listen;
    info!(%addr, "starting gateway HTTP server");
    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("shutting down");
        })
        .await?;

    gc_handle.abort();
    health_handle.abort();

    info!("gateway shut down gracefully");
    Ok(())
}
