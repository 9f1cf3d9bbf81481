//! Write pipeline: dedup check -> encode -> placement -> quorum commit
//! -> metadata insert (spec §4.4, C7).

use crate::gateway::Gateway;
use crate::health::now_unix;
use crate::quota;
use bytes::Bytes;
use futures::future::join_all;
use objectio_common::{ContentHash, Consistency, Error, Result, UploadNonce, VersionId};
use objectio_meta_store::ShardLocationRecord;
use objectio_placement::NodeEntry;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct WriteOutcome {
    pub version_id: VersionId,
    pub content_hash: ContentHash,
    pub deduplicated: bool,
    pub size: u64,
}

pub async fn put_object(
    gateway: &Gateway,
    bucket: &str,
    key: &str,
    blob: Bytes,
    consistency: Consistency,
    region: Option<&str>,
) -> Result<WriteOutcome> {
    let now = now_unix();
    gateway.meta.create_bucket(bucket, true, now)?;

    let content_hash = ContentHash::of(&blob);
    let size = blob.len() as u64;

    quota::check_write(&gateway.meta, &gateway.config, bucket, size)?;

    let lock = gateway.bucket_lock(bucket);
    let _guard = lock.lock().await;

    // re-check under the lock: another writer to this bucket may have
    // landed between the pre-check above and acquiring the lock.
    quota::check_write(&gateway.meta, &gateway.config, bucket, size)?;

    if let Some(existing) = gateway.meta.get_content(content_hash.as_str())? {
        let version_id = VersionId::new();
        gateway.meta.commit_dedup_write(
            content_hash.as_str(),
            bucket,
            key,
            &version_id.to_string(),
            existing.size,
            now,
        )?;
        return Ok(WriteOutcome {
            version_id,
            content_hash,
            deduplicated: true,
            size: existing.size,
        });
    }

    let shards = gateway.codec.encode(&blob)?;
    let total = shards.len();
    let k = gateway.codec.data_shards();
    let nodes = gateway.registry.select_nodes(total, region)?;

    let upload_nonce = UploadNonce::new();
    let puts = shards
        .into_iter()
        .zip(nodes.iter())
        .enumerate()
        .map(|(i, (shard_bytes, node))| {
            let transport = gateway.transport.clone();
            let node = node.clone();
            let bucket = bucket.to_string();
            let key = key.to_string();
            let shard_key = format!("{key}/{upload_nonce}/{i}");
            async move {
                let result = transport
                    .put(&node, &bucket, &shard_key, Bytes::from(shard_bytes))
                    .await;
                (
                    u8::try_from(i).unwrap_or(u8::MAX),
                    node,
                    shard_key,
                    result,
                )
            }
        });

    let results = join_all(puts).await;

    let quorum = if consistency == Consistency::Strong {
        k
    } else {
        total
    };

    let succeeded: Vec<(u8, NodeEntry, String)> = results
        .iter()
        .filter_map(|(idx, node, shard_key, result)| {
            result
                .as_ref()
                .ok()
                .map(|()| (*idx, node.clone(), shard_key.clone()))
        })
        .collect();

    if succeeded.len() < quorum {
        for (_, node, shard_key) in &succeeded {
            if let Err(e) = gateway.transport.delete(node, bucket, shard_key).await {
                warn!(node = %node.node_id, %shard_key, error = %e, "orphan shard cleanup failed after quorum miss");
            }
        }
        return Err(Error::QuorumNotMet {
            succeeded: succeeded.len(),
            required: quorum,
        });
    }

    let shard_layout: Vec<ShardLocationRecord> = succeeded
        .into_iter()
        .map(|(index, node, shard_key)| ShardLocationRecord {
            index,
            node_id: node.node_id.as_str().to_string(),
            shard_key,
        })
        .collect();

    let version_id = VersionId::new();
    gateway.meta.commit_new_content_write(
        content_hash.as_str(),
        size,
        shard_layout,
        bucket,
        key,
        &version_id.to_string(),
        now,
    )?;

    Ok(WriteOutcome {
        version_id,
        content_hash,
        deduplicated: false,
        size,
    })
}
