//! Pre-write quota gate (spec §4.9, C9).

use objectio_common::{Error, GatewayConfig, QuotaDimension, Result};
use objectio_meta_store::MetaStore;

/// Fail with `QuotaExceeded` if writing `additional_bytes` (+1 object)
/// would push `bucket` over its configured or default limits.
///
/// Deduplicated writes still count against quota: this is called
/// before the dedup lookup, using the proposed object's logical size,
/// not whatever physical shard bytes dedup may skip (spec §4.9).
pub fn check_write(
    meta: &MetaStore,
    config: &GatewayConfig,
    bucket: &str,
    additional_bytes: u64,
) -> Result<()> {
    let (max_bytes, max_objects) = match meta.get_quota(bucket)? {
        Some(q) => (q.max_size_bytes, q.max_objects),
        None => (
            config.default_quota.max_size_bytes,
            config.default_quota.max_objects,
        ),
    };

    let (used_bytes, used_objects) = meta.bucket_usage(bucket)?;

    if used_bytes + additional_bytes > max_bytes {
        return Err(Error::QuotaExceeded {
            dimension: QuotaDimension::Bytes,
            used: used_bytes,
            limit: max_bytes,
        });
    }
    if used_objects + 1 > max_objects {
        return Err(Error::QuotaExceeded {
            dimension: QuotaDimension::Objects,
            used: used_objects,
            limit: max_objects,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use objectio_meta_store::{BucketQuotaRecord, ShardLocationRecord};

    fn store() -> MetaStore {
        let dir = tempfile::tempdir().unwrap();
        MetaStore::open(dir.into_path().join("meta.redb")).unwrap()
    }

    fn layout() -> Vec<ShardLocationRecord> {
        vec![ShardLocationRecord {
            index: 0,
            node_id: "n0".into(),
            shard_key: "k".into(),
        }]
    }

    #[test]
    fn passes_under_default_limits() {
        let store = store();
        let config = GatewayConfig::default();
        assert!(check_write(&store, &config, "b", 1024).is_ok());
    }

    #[test]
    fn fails_over_configured_byte_limit() {
        let store = store();
        let config = GatewayConfig::default();
        store
            .set_quota(
                "b",
                &BucketQuotaRecord {
                    max_size_bytes: 10,
                    max_objects: 100,
                },
            )
            .unwrap();
        let err = check_write(&store, &config, "b", 11).unwrap_err();
        assert!(matches!(
            err,
            Error::QuotaExceeded {
                dimension: QuotaDimension::Bytes,
                ..
            }
        ));
    }

    #[test]
    fn fails_over_configured_object_limit() {
        let store = store();
        let config = GatewayConfig::default();
        store
            .set_quota(
                "b",
                &BucketQuotaRecord {
                    max_size_bytes: 1_000_000,
                    max_objects: 0,
                },
            )
            .unwrap();
        let (content, _) = store.get_or_create_content("h", 1, layout()).unwrap();
        store
            .put_object_version("b", "k", "v1", 1, &content.content_hash, 0)
            .unwrap();
        let err = check_write(&store, &config, "b", 1).unwrap_err();
        assert!(matches!(
            err,
            Error::QuotaExceeded {
                dimension: QuotaDimension::Objects,
                ..
            }
        ));
    }
}
