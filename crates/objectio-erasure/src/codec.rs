//! Reed-Solomon encoder/decoder
//!
//! High-level `ErasureCodec` API over the `backend` module's
//! `ErasureBackend` trait. The gateway always constructs this with the
//! fixed K=4, M=6 parameters from spec §4.1; the constructor still takes
//! `(k, m)` so the codec itself stays general and testable.
//!
//! ```
//! use objectio_erasure::ErasureCodec;
//!
//! let codec = ErasureCodec::new(4, 2).unwrap();
//! let data = b"Hello, World!";
//! let shards = codec.encode(data).unwrap();
//! ```

use crate::backend::{BackendConfig, BackendFactory, ErasureBackend};
use objectio_common::Error as CommonError;
use std::sync::Arc;
use thiserror::Error;

/// Errors specific to erasure coding operations.
#[derive(Debug, Error)]
pub enum ErasureError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("encoding failed: {0}")]
    EncodingFailed(String),

    #[error("decoding failed: {0}")]
    DecodingFailed(String),

    #[error("insufficient shards: have {available}, need {required}")]
    InsufficientShards { available: usize, required: usize },

    #[error("shard size mismatch")]
    ShardSizeMismatch,
}

impl From<ErasureError> for CommonError {
    fn from(e: ErasureError) -> Self {
        CommonError::Erasure(e.to_string())
    }
}

/// K=4, M=6 Reed-Solomon codec (spec §4.1). `encode` pads the blob to a
/// multiple of K and splits into K data shards; `decode` requires the
/// original size since padding is silent and unrecoverable from shards
/// alone.
pub struct ErasureCodec {
    backend: Arc<dyn ErasureBackend>,
}

impl ErasureCodec {
    /// Build a codec for the fixed K=4, M=6 scheme the gateway uses.
    pub fn standard() -> Result<Self, ErasureError> {
        Self::new(4, 2)
    }

    pub fn new(data_shards: u8, parity_shards: u8) -> Result<Self, ErasureError> {
        if data_shards == 0 {
            return Err(ErasureError::InvalidConfig("data_shards must be > 0".into()));
        }
        if parity_shards == 0 {
            return Err(ErasureError::InvalidConfig(
                "parity_shards must be > 0".into(),
            ));
        }
        let backend_config = BackendConfig::mds(data_shards, parity_shards);
        let backend = BackendFactory::create_mds(&backend_config)?;
        Ok(Self { backend })
    }

    #[must_use]
    pub fn data_shards(&self) -> usize {
        self.backend.data_shards()
    }

    #[must_use]
    pub fn parity_shards(&self) -> usize {
        self.backend.parity_shards()
    }

    #[must_use]
    pub fn total_shards(&self) -> usize {
        self.backend.total_shards()
    }

    /// Encode `data` into `k+m` shards of equal length
    /// `⌈|data|/k⌉` (minimum 64 bytes, the SIMD backend's floor).
    pub fn encode(&self, data: &[u8]) -> Result<Vec<Vec<u8>>, ErasureError> {
        let k = self.data_shards();

        let shard_size = data.len().div_ceil(k).max(64);
        let padded_size = shard_size * k;

        let mut padded = vec![0u8; padded_size];
        padded[..data.len()].copy_from_slice(data);

        let data_shards: Vec<&[u8]> = (0..k)
            .map(|i| &padded[i * shard_size..(i + 1) * shard_size])
            .collect();

        self.backend
            .encode(&data_shards, shard_size)
            .map_err(|e| ErasureError::EncodingFailed(e.to_string()))
    }

    /// Reconstruct the original blob from at least `k` of the `k+m`
    /// shards (indexed by position in `shards`), truncated to
    /// `original_size`.
    pub fn decode(
        &self,
        shards: &mut [Option<Vec<u8>>],
        original_size: usize,
    ) -> Result<Vec<u8>, ErasureError> {
        let k = self.data_shards();
        let total = self.total_shards();

        if shards.len() != total {
            return Err(ErasureError::ShardSizeMismatch);
        }

        let available = shards.iter().filter(|s| s.is_some()).count();
        if available < k {
            return Err(ErasureError::InsufficientShards {
                available,
                required: k,
            });
        }

        let shard_size = shards
            .iter()
            .find_map(|s| s.as_ref().map(Vec::len))
            .ok_or(ErasureError::InsufficientShards {
                available: 0,
                required: k,
            })?;

        let data_shards_ok = shards[..k].iter().all(Option::is_some);
        let data: Vec<Vec<u8>> = if data_shards_ok {
            shards[..k]
                .iter()
                .map(|s| s.as_ref().unwrap().clone())
                .collect()
        } else {
            let missing_indices: Vec<usize> = shards
                .iter()
                .enumerate()
                .filter_map(|(i, s)| if s.is_none() { Some(i) } else { None })
                .collect();
            let shard_refs: Vec<Option<&[u8]>> =
                shards.iter().map(|s| s.as_deref()).collect();
            let decoded = self
                .backend
                .decode(&shard_refs, shard_size, &missing_indices)
                .map_err(|e| ErasureError::DecodingFailed(e.to_string()))?;
            decoded.into_iter().take(k).collect()
        };

        let mut output = Vec::with_capacity(k * shard_size);
        for shard in data {
            output.extend_from_slice(&shard);
        }
        output.truncate(original_size);
        Ok(output)
    }

    /// Re-encode the data shards and compare against the supplied parity.
    pub fn verify(&self, shards: &[Vec<u8>]) -> Result<bool, ErasureError> {
        if shards.len() != self.total_shards() {
            return Ok(false);
        }
        if let Some(first_len) = shards.first().map(Vec::len) {
            if !shards.iter().all(|s| s.len() == first_len) {
                return Ok(false);
            }
        }
        let refs: Vec<&[u8]> = shards.iter().map(Vec::as_slice).collect();
        self.backend
            .verify(&refs)
            .map_err(|e| ErasureError::EncodingFailed(e.to_string()))
    }
}
