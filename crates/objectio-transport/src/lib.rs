//! HTTP shard transport: `put`/`get`/`delete` of one shard against one
//! storage node (spec §4.3, §6 storage-node HTTP contract).
//!
//! No retries at this layer — the write/read pipelines decide what to
//! do with an aggregate of per-shard results (spec §7 propagation
//! policy).

use objectio_placement::NodeEntry;
use std::time::Duration;
use thiserror::Error;

const PUT_TIMEOUT: Duration = Duration::from_secs(10);
const GET_TIMEOUT: Duration = Duration::from_secs(5);
const DELETE_TIMEOUT: Duration = Duration::from_secs(5);
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Discriminated shard-transport failure (spec §4.3).
#[derive(Debug, Error, Clone)]
pub enum TransportError {
    #[error("timeout")]
    Timeout,
    #[error("connection refused")]
    ConnectionRefused,
    #[error("http status {0}")]
    HttpStatus(u16),
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::ConnectionRefused
        } else if let Some(status) = e.status() {
            Self::HttpStatus(status.as_u16())
        } else {
            Self::Other(e.to_string())
        }
    }
}

pub type TransportResult<T> = Result<T, TransportError>;

/// A thin client wrapping one shared `reqwest::Client`. Connection
/// pooling across nodes is handled internally by `reqwest`, so unlike
/// a gRPC channel pool there is nothing per-node to cache here.
#[derive(Clone)]
pub struct ShardTransport {
    client: reqwest::Client,
}

impl ShardTransport {
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// `PUT /internal/objects/{bucket}/{shard_key}`, multipart field `file`.
    pub async fn put(
        &self,
        node: &NodeEntry,
        bucket: &str,
        shard_key: &str,
        bytes: bytes::Bytes,
    ) -> TransportResult<()> {
        let url = format!(
            "{}/internal/objects/{bucket}/{shard_key}",
            node.base_url.trim_end_matches('/')
        );
        let part = reqwest::multipart::Part::bytes(bytes.to_vec()).file_name("shard");
        let form = reqwest::multipart::Form::new().part("file", part);

        let resp = self
            .client
            .put(&url)
            .timeout(PUT_TIMEOUT)
            .multipart(form)
            .send()
            .await?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(TransportError::HttpStatus(resp.status().as_u16()))
        }
    }

    /// `GET /internal/objects/{bucket}/{shard_key}`.
    pub async fn get(
        &self,
        node: &NodeEntry,
        bucket: &str,
        shard_key: &str,
    ) -> TransportResult<bytes::Bytes> {
        let url = format!(
            "{}/internal/objects/{bucket}/{shard_key}",
            node.base_url.trim_end_matches('/')
        );

        let resp = self.client.get(&url).timeout(GET_TIMEOUT).send().await?;

        if resp.status().is_success() {
            Ok(resp.bytes().await?)
        } else {
            Err(TransportError::HttpStatus(resp.status().as_u16()))
        }
    }

    /// `DELETE /internal/objects/{bucket}/{shard_key}`.
    pub async fn delete(
        &self,
        node: &NodeEntry,
        bucket: &str,
        shard_key: &str,
    ) -> TransportResult<()> {
        let url = format!(
            "{}/internal/objects/{bucket}/{shard_key}",
            node.base_url.trim_end_matches('/')
        );

        let resp = self
            .client
            .delete(&url)
            .timeout(DELETE_TIMEOUT)
            .send()
            .await?;

        if resp.status().is_success() || resp.status().as_u16() == 404 {
            Ok(())
        } else {
            Err(TransportError::HttpStatus(resp.status().as_u16()))
        }
    }

    /// `GET /internal/health` (spec §4.8 health monitor probe).
    pub async fn health(&self, node: &NodeEntry) -> TransportResult<Duration> {
        let url = format!("{}/internal/health", node.base_url.trim_end_matches('/'));
        let started = std::time::Instant::now();

        let resp = self
            .client
            .get(&url)
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await?;

        if resp.status().is_success() {
            Ok(started.elapsed())
        } else {
            Err(TransportError::HttpStatus(resp.status().as_u16()))
        }
    }
}

impl Default for ShardTransport {
    fn default() -> Self {
        Self::new()
    }
}
