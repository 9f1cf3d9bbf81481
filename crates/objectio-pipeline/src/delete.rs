//! Delete pipeline (spec §4.6).
//!
//! Only the current latest version is removable through this path; it
//! is not promoted from a prior version, so a subsequent GET without an
//! explicit version-id returns `NotFound`.

use crate::gateway::Gateway;
use objectio_common::{Error, NodeId, Result};
use tracing::warn;

pub async fn delete_object(gateway: &Gateway, bucket: &str, key: &str) -> Result<()> {
    let (_removed, freed_layout) = gateway
        .meta
        .delete_latest_and_decr_refcount(bucket, key)?
        .ok_or_else(|| Error::ObjectNotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })?;

    let Some(shard_layout) = freed_layout else {
        return Ok(());
    };

    // refcount hit zero: the shard deletes are no longer best-effort —
    // they must be attempted (failures logged, not retried) since the
    // ContentRow owning them is already gone (spec §4.6).
    for loc in shard_layout {
        let Some(node) = gateway.registry.get(&NodeId::new(loc.node_id.clone())) else {
            warn!(node_id = %loc.node_id, "shard cleanup: node no longer in registry");
            continue;
        };
        if let Err(e) = gateway.transport.delete(node, bucket, &loc.shard_key).await {
            warn!(node_id = %loc.node_id, shard_key = %loc.shard_key, error = %e, "shard cleanup failed after content row deletion");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read::get_object;
    use crate::test_support::test_gateway;
    use crate::write::put_object;
    use bytes::Bytes;
    use objectio_common::Consistency;

    #[tokio::test]
    async fn delete_removes_content_row_when_refcount_hits_zero() {
        let (gateway, _nodes) = test_gateway(6).await;
        let blob = Bytes::from_static(b"to be deleted");
        let outcome = put_object(&gateway, "b", "k", blob, Consistency::Strong, None)
            .await
            .unwrap();

        delete_object(&gateway, "b", "k").await.unwrap();

        assert!(gateway
            .meta
            .get_content(outcome.content_hash.as_str())
            .unwrap()
            .is_none());
        let err = get_object(&gateway, "b", "k", None).await.unwrap_err();
        assert!(matches!(err, Error::ObjectNotFound { .. }));
    }

    #[tokio::test]
    async fn delete_does_not_promote_prior_version() {
        let (gateway, _nodes) = test_gateway(6).await;
        put_object(
            &gateway,
            "b",
            "k",
            Bytes::from_static(b"version one bytes"),
            Consistency::Strong,
            None,
        )
        .await
        .unwrap();
        put_object(
            &gateway,
            "b",
            "k",
            Bytes::from_static(b"version two bytes, longer"),
            Consistency::Strong,
            None,
        )
        .await
        .unwrap();

        delete_object(&gateway, "b", "k").await.unwrap();
        let err = get_object(&gateway, "b", "k", None).await.unwrap_err();
        assert!(matches!(err, Error::ObjectNotFound { .. }));
    }

    #[tokio::test]
    async fn delete_missing_key_fails_not_found() {
        let (gateway, _nodes) = test_gateway(6).await;
        let err = delete_object(&gateway, "b", "nope").await.unwrap_err();
        assert!(matches!(err, Error::ObjectNotFound { .. }));
    }

    #[tokio::test]
    async fn dedup_delete_keeps_shared_content_row_alive() {
        let (gateway, _nodes) = test_gateway(6).await;
        let blob = Bytes::from_static(b"shared payload across two keys");
        let outcome = put_object(&gateway, "b", "k1", blob.clone(), Consistency::Strong, None)
            .await
            .unwrap();
        put_object(&gateway, "b", "k2", blob, Consistency::Strong, None)
            .await
            .unwrap();

        delete_object(&gateway, "b", "k1").await.unwrap();

        let content = gateway
            .meta
            .get_content(outcome.content_hash.as_str())
            .unwrap();
        assert!(content.is_some());
        assert_eq!(content.unwrap().refcount, 1);
        assert!(get_object(&gateway, "b", "k2", None).await.is_ok());
    }
}
