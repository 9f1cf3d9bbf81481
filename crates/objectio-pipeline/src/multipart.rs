//! Multipart upload (spec §3 `MultipartSession`, §4.12).
//!
//! Out of scope as "hard engineering" (spec §1), so this is plain
//! concatenation: parts are staged in local scratch files, and
//! `complete` hands the joined bytes to the ordinary write pipeline.
//! Parts are staged under the OS temp dir, one subdirectory per
//! upload-id, removed on both complete and abort.

use crate::gateway::Gateway;
use crate::health::now_unix;
use crate::write::{self, WriteOutcome};
use bytes::Bytes;
use objectio_common::{Consistency, Error, Result};
use objectio_meta_store::MultipartPartRecord;
use std::path::PathBuf;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

fn scratch_dir(upload_id: &str) -> PathBuf {
    std::env::temp_dir().join("objectio-multipart").join(upload_id)
}

fn to_io_err(e: std::io::Error) -> Error {
    Error::internal(format!("multipart scratch I/O: {e}"))
}

pub async fn initiate_multipart(gateway: &Gateway, bucket: &str, key: &str) -> Result<String> {
    let upload_id = uuid::Uuid::new_v4().to_string();
    gateway
        .meta
        .initiate_multipart(&upload_id, bucket, key, now_unix())?;
    tokio::fs::create_dir_all(scratch_dir(&upload_id))
        .await
        .map_err(to_io_err)?;
    Ok(upload_id)
}

pub async fn upload_part(
    gateway: &Gateway,
    upload_id: &str,
    part_number: u32,
    bytes: Bytes,
) -> Result<()> {
    gateway
        .meta
        .get_multipart(upload_id)?
        .ok_or_else(|| Error::NoSuchUpload {
            upload_id: upload_id.to_string(),
        })?;

    let path = scratch_dir(upload_id).join(part_number.to_string());
    let mut file = tokio::fs::File::create(&path).await.map_err(to_io_err)?;
    file.write_all(&bytes).await.map_err(to_io_err)?;

    let content_hash = objectio_common::ContentHash::of(&bytes);
    gateway.meta.put_multipart_part(
        upload_id,
        MultipartPartRecord {
            part_number,
            size: bytes.len() as u64,
            content_hash: content_hash.as_str().to_string(),
        },
    )?;
    Ok(())
}

pub async fn complete_multipart(
    gateway: &Gateway,
    upload_id: &str,
    consistency: Consistency,
    region: Option<&str>,
) -> Result<WriteOutcome> {
    let session = gateway
        .meta
        .get_multipart(upload_id)?
        .ok_or_else(|| Error::NoSuchUpload {
            upload_id: upload_id.to_string(),
        })?;

    let mut part_numbers: Vec<u32> = session.parts.keys().copied().collect();
    part_numbers.sort_unstable();

    let mut joined = Vec::new();
    let dir = scratch_dir(upload_id);
    for part_number in part_numbers {
        let path = dir.join(part_number.to_string());
        let mut file = tokio::fs::File::open(&path).await.map_err(to_io_err)?;
        file.read_to_end(&mut joined).await.map_err(to_io_err)?;
    }

    let outcome = write::put_object(
        gateway,
        &session.bucket,
        &session.key,
        Bytes::from(joined),
        consistency,
        region,
    )
    .await?;

    gateway.meta.remove_multipart(upload_id)?;
    let _ = tokio::fs::remove_dir_all(dir).await;

    Ok(outcome)
}

pub async fn abort_multipart(gateway: &Gateway, upload_id: &str) -> Result<()> {
    gateway
        .meta
        .remove_multipart(upload_id)?
        .ok_or_else(|| Error::NoSuchUpload {
            upload_id: upload_id.to_string(),
        })?;
    let _ = tokio::fs::remove_dir_all(scratch_dir(upload_id)).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_gateway;

    #[tokio::test]
    async fn multipart_round_trips_through_complete() {
        let (gateway, _nodes) = test_gateway(6).await;
        let upload_id = initiate_multipart(&gateway, "b", "k").await.unwrap();

        upload_part(&gateway, &upload_id, 1, Bytes::from_static(b"hello, "))
            .await
            .unwrap();
        upload_part(&gateway, &upload_id, 2, Bytes::from_static(b"world!"))
            .await
            .unwrap();

        let outcome = complete_multipart(&gateway, &upload_id, Consistency::Strong, None)
            .await
            .unwrap();
        assert_eq!(outcome.size, 13);

        let (bytes, _) = crate::read::get_object(&gateway, "b", "k", None)
            .await
            .unwrap();
        assert_eq!(bytes, Bytes::from_static(b"hello, world!"));

        assert!(gateway.meta.get_multipart(&upload_id).unwrap().is_none());
    }

    #[tokio::test]
    async fn abort_discards_staged_parts() {
        let (gateway, _nodes) = test_gateway(6).await;
        let upload_id = initiate_multipart(&gateway, "b", "k").await.unwrap();
        upload_part(&gateway, &upload_id, 1, Bytes::from_static(b"data"))
            .await
            .unwrap();

        abort_multipart(&gateway, &upload_id).await.unwrap();
        assert!(gateway.meta.get_multipart(&upload_id).unwrap().is_none());

        let err = complete_multipart(&gateway, &upload_id, Consistency::Strong, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoSuchUpload { .. }));
    }

    #[tokio::test]
    async fn upload_part_rejects_unknown_upload_id() {
        let (gateway, _nodes) = test_gateway(6).await;
        let err = upload_part(&gateway, "bogus", 1, Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoSuchUpload { .. }));
    }
}
