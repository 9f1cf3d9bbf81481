//! Read pipeline: resolve version -> fan out shard GETs -> decode
//! (spec §4.5, C8).

use crate::gateway::Gateway;
use bytes::Bytes;
use futures::stream::{FuturesUnordered, StreamExt};
use objectio_common::{Error, Result};
use objectio_meta_store::ObjectVersionRecord;

pub async fn get_object(
    gateway: &Gateway,
    bucket: &str,
    key: &str,
    version_id: Option<&str>,
) -> Result<(Bytes, ObjectVersionRecord)> {
    let version = gateway
        .meta
        .get_object_version(bucket, key, version_id)?
        .ok_or_else(|| Error::ObjectNotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })?;

    let content = gateway
        .meta
        .get_content(&version.content_hash)?
        .ok_or_else(|| Error::internal(format!("content row missing for {}", version.content_hash)))?;

    let total = gateway.codec.total_shards();
    let k = gateway.codec.data_shards();

    // Fan out all shard GETs but stop consuming results once K distinct
    // indices have arrived, instead of waiting for every node to
    // respond — a single slow (not failed) node must not stall the
    // read for its full GET timeout when K shards already landed
    // (spec §4.5 steps 4-5). Dropping `fetches` cancels the rest.
    let mut fetches: FuturesUnordered<_> = content
        .shard_layout
        .iter()
        .map(|loc| {
            let transport = gateway.transport.clone();
            let node = gateway.registry.get(&objectio_common::NodeId::new(loc.node_id.clone())).cloned();
            let bucket = bucket.to_string();
            let shard_key = loc.shard_key.clone();
            let index = loc.index;
            async move {
                let Some(node) = node else {
                    return (index, None);
                };
                match transport.get(&node, &bucket, &shard_key).await {
                    Ok(bytes) => (index, Some(bytes.to_vec())),
                    Err(_) => (index, None),
                }
            }
        })
        .collect();

    let mut shard_opts: Vec<Option<Vec<u8>>> = vec![None; total];
    let mut available = 0usize;
    while available < k {
        let Some((index, bytes)) = fetches.next().await else {
            break;
        };
        if let Some(bytes) = bytes {
            let idx = index as usize;
            if idx < total && shard_opts[idx].is_none() {
                shard_opts[idx] = Some(bytes);
                available += 1;
            }
        }
    }

    if available < k {
        return Err(Error::DegradedUnreadable {
            available,
            required: k,
        });
    }

    let decoded = gateway
        .codec
        .decode(&mut shard_opts, version.size as usize)?;

    Ok((Bytes::from(decoded), version))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fake_storage_node, test_gateway};
    use crate::write::put_object;
    use objectio_common::Consistency;

    #[tokio::test]
    async fn round_trips_through_write_then_read() {
        let (gateway, _nodes) = test_gateway(6).await;
        let blob = Bytes::from_static(b"round trip payload");
        put_object(&gateway, "b", "k", blob.clone(), Consistency::Strong, None)
            .await
            .unwrap();

        let (read_back, version) = get_object(&gateway, "b", "k", None).await.unwrap();
        assert_eq!(read_back, blob);
        assert!(version.is_latest);
    }

    #[tokio::test]
    async fn missing_key_is_not_found() {
        let (gateway, _nodes) = test_gateway(6).await;
        let err = get_object(&gateway, "b", "nope", None).await.unwrap_err();
        assert!(matches!(err, Error::ObjectNotFound { .. }));
    }

    #[tokio::test]
    async fn degraded_unreadable_when_below_k_shards_available() {
        let (gateway, _nodes) = fake_storage_node::broken_fleet(6, 6).await;
        let blob = Bytes::from_static(b"will be partially unreadable after the fact");
        put_object(&gateway, "b", "k", blob, Consistency::Strong, None)
            .await
            .unwrap();

        // simulate 3 of 6 nodes going dark after the write committed
        for loc in gateway
            .meta
            .get_object_version("b", "k", None)
            .unwrap()
            .and_then(|v| gateway.meta.get_content(&v.content_hash).unwrap())
            .unwrap()
            .shard_layout
            .iter()
            .take(3)
        {
            let node = gateway
                .registry
                .get(&objectio_common::NodeId::new(loc.node_id.clone()))
                .unwrap();
            gateway
                .transport
                .delete(node, "b", &loc.shard_key)
                .await
                .unwrap();
        }

        let err = get_object(&gateway, "b", "k", None).await.unwrap_err();
        assert!(matches!(err, Error::DegradedUnreadable { .. }));
    }
}
