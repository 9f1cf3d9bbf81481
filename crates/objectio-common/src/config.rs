//! Gateway configuration
//!
//! Layered the way the teacher lays out its `Config` hierarchy: nested
//! structs with `Default` impls, parsed from env/file via the `config`
//! crate and overridable from CLI flags at the binary entrypoint.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Root gateway configuration (spec §6 "Configuration").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub network: NetworkConfig,
    pub nodes: NodeRegistryConfig,
    pub meta_store: MetaStoreConfig,
    pub versioning: VersioningConfig,
    pub rate_limit: RateLimitConfig,
    pub default_quota: QuotaDefaults,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            nodes: NodeRegistryConfig::default(),
            meta_store: MetaStoreConfig::default(),
            versioning: VersioningConfig::default(),
            rate_limit: RateLimitConfig::default(),
            default_quota: QuotaDefaults::default(),
        }
    }
}

/// Network listen configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Address the gateway HTTP API listens on.
    pub listen: SocketAddr,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".parse().unwrap(),
        }
    }
}

/// Static node registry loaded at startup (spec §4.2).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NodeRegistryConfig {
    /// `node_id:base_url` pairs, in declared order — order matters for
    /// the deterministic placement fallback (spec §4.2 step 2).
    pub nodes: Vec<(String, String)>,
    /// `region -> node_ids`, in declared order.
    pub regions: HashMap<String, Vec<String>>,
}

impl NodeRegistryConfig {
    /// Parse `node_id:url,node_id:url,...`.
    pub fn parse_nodes(spec: &str) -> Result<Vec<(String, String)>, String> {
        spec.split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|pair| {
                pair.split_once(':')
                    .map(|(id, url)| (id.to_string(), url.to_string()))
                    .ok_or_else(|| format!("malformed node entry: {pair}"))
            })
            .collect()
    }

    /// Parse `region:node_id,node_id;region:node_id,...`.
    pub fn parse_regions(spec: &str) -> Result<HashMap<String, Vec<String>>, String> {
        let mut out = HashMap::new();
        for group in spec.split(';').filter(|s| !s.trim().is_empty()) {
            let (region, ids) = group
                .split_once(':')
                .ok_or_else(|| format!("malformed region group: {group}"))?;
            out.insert(
                region.to_string(),
                ids.split(',').map(str::to_string).collect(),
            );
        }
        Ok(out)
    }
}

/// Metadata store location.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetaStoreConfig {
    pub db_path: PathBuf,
}

impl Default for MetaStoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("/var/lib/objectio/meta.redb"),
        }
    }
}

/// Version retention / GC tuning (spec §4.10, §6).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VersioningConfig {
    pub max_versions: Option<u32>,
    pub retention_days: u32,
    pub health_interval_seconds: u64,
    pub gc_interval_hours: u64,
}

impl Default for VersioningConfig {
    fn default() -> Self {
        Self {
            max_versions: None,
            retention_days: 7,
            health_interval_seconds: 30,
            gc_interval_hours: 1,
        }
    }
}

/// Ambient fixed-window rate limiter (§4.13 — external-collaborator,
/// thin middleware only).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub requests_per_minute: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 600,
        }
    }
}

/// Default `BucketQuota` applied when no row exists (spec §4.9).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuotaDefaults {
    pub max_size_bytes: u64,
    pub max_objects: u64,
}

impl Default for QuotaDefaults {
    fn default() -> Self {
        Self {
            max_size_bytes: 10 * 1024 * 1024 * 1024, // 10 GiB
            max_objects: 10_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GatewayConfig::default();
        assert_eq!(config.network.listen.port(), 8080);
        assert_eq!(config.versioning.retention_days, 7);
        assert_eq!(config.default_quota.max_objects, 10_000);
    }

    #[test]
    fn parse_nodes_list() {
        let nodes = NodeRegistryConfig::parse_nodes("n1:http://a,n2:http://b").unwrap();
        assert_eq!(
            nodes,
            vec![
                ("n1".to_string(), "http://a".to_string()),
                ("n2".to_string(), "http://b".to_string()),
            ]
        );
    }

    #[test]
    fn parse_regions_map() {
        let regions = NodeRegistryConfig::parse_regions("us:n1,n2;eu:n3").unwrap();
        assert_eq!(regions["us"], vec!["n1".to_string(), "n2".to_string()]);
        assert_eq!(regions["eu"], vec!["n3".to_string()]);
    }

    #[test]
    fn parse_nodes_rejects_malformed() {
        assert!(NodeRegistryConfig::parse_nodes("bad-entry").is_err());
    }
}
