//! Pure Rust SIMD backend using reed-solomon-simd
//!
//! Portable erasure coding via the `reed-solomon-simd` crate, which uses
//! SIMD instructions where available (SSE, AVX, NEON) without any FFI.

use super::{BackendCapabilities, BackendResult, ErasureBackend};
use crate::ErasureError;
use reed_solomon_simd::{ReedSolomonDecoder, ReedSolomonEncoder};

/// Standard Reed-Solomon MDS backend: any `k` of `k+m` shards
/// reconstruct the original data.
pub struct RustSimdBackend {
    data_shards: u8,
    parity_shards: u8,
}

impl RustSimdBackend {
    pub fn new(data_shards: u8, parity_shards: u8) -> Result<Self, ErasureError> {
        if data_shards == 0 {
            return Err(ErasureError::InvalidConfig(
                "data_shards must be > 0".into(),
            ));
        }
        if parity_shards == 0 {
            return Err(ErasureError::InvalidConfig(
                "parity_shards must be > 0".into(),
            ));
        }
        if data_shards as usize + parity_shards as usize > 255 {
            return Err(ErasureError::InvalidConfig(
                "total shards must be <= 255".into(),
            ));
        }
        Ok(Self {
            data_shards,
            parity_shards,
        })
    }
}

impl ErasureBackend for RustSimdBackend {
    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            name: "rust_simd",
            supports_simd: true,
            max_data_shards: 255,
            max_parity_shards: 255,
        }
    }

    fn data_shards(&self) -> usize {
        self.data_shards as usize
    }

    fn parity_shards(&self) -> usize {
        self.parity_shards as usize
    }

    fn encode(&self, data_shards: &[&[u8]], shard_size: usize) -> BackendResult<Vec<Vec<u8>>> {
        let k = self.data_shards as usize;
        let m = self.parity_shards as usize;

        if data_shards.len() != k {
            return Err(ErasureError::InvalidConfig(format!(
                "expected {k} data shards, got {}",
                data_shards.len()
            )));
        }

        for (i, shard) in data_shards.iter().enumerate() {
            if shard.len() != shard_size {
                return Err(ErasureError::InvalidConfig(format!(
                    "shard {i} has size {}, expected {shard_size}",
                    shard.len()
                )));
            }
        }

        let mut encoder = ReedSolomonEncoder::new(k, m, shard_size)
            .map_err(|e| ErasureError::InvalidConfig(e.to_string()))?;

        for shard in data_shards {
            encoder
                .add_original_shard(shard)
                .map_err(|e| ErasureError::EncodingFailed(e.to_string()))?;
        }

        let result = encoder
            .encode()
            .map_err(|e| ErasureError::EncodingFailed(e.to_string()))?;

        let mut shards: Vec<Vec<u8>> = Vec::with_capacity(k + m);

        for shard in data_shards {
            shards.push(shard.to_vec());
        }
        for parity in result.recovery_iter() {
            shards.push(parity.to_vec());
        }

        Ok(shards)
    }

    fn decode(
        &self,
        shards: &[Option<&[u8]>],
        shard_size: usize,
        _missing_indices: &[usize],
    ) -> BackendResult<Vec<Vec<u8>>> {
        let k = self.data_shards as usize;
        let m = self.parity_shards as usize;

        let available = shards.iter().filter(|s| s.is_some()).count();
        if available < k {
            return Err(ErasureError::InsufficientShards {
                available,
                required: k,
            });
        }

        if shards.len() != k + m {
            return Err(ErasureError::InvalidConfig(format!(
                "expected {} shards, got {}",
                k + m,
                shards.len()
            )));
        }

        let mut decoder = ReedSolomonDecoder::new(k, m, shard_size)
            .map_err(|e| ErasureError::InvalidConfig(e.to_string()))?;

        for (i, shard) in shards.iter().enumerate().take(k) {
            if let Some(data) = shard {
                decoder
                    .add_original_shard(i, data)
                    .map_err(|e| ErasureError::DecodingFailed(e.to_string()))?;
            }
        }

        for i in 0..m {
            if let Some(data) = shards[k + i] {
                decoder
                    .add_recovery_shard(i, data)
                    .map_err(|e| ErasureError::DecodingFailed(e.to_string()))?;
            }
        }

        let result = decoder
            .decode()
            .map_err(|e| ErasureError::DecodingFailed(e.to_string()))?;

        let mut all_shards: Vec<Vec<u8>> = Vec::with_capacity(k + m);

        for (i, shard) in shards.iter().enumerate().take(k) {
            if let Some(data) = shard {
                all_shards.push(data.to_vec());
            } else if let Some(restored) = result.restored_original(i) {
                all_shards.push(restored.to_vec());
            } else {
                return Err(ErasureError::DecodingFailed(format!(
                    "failed to restore data shard {i}"
                )));
            }
        }

        // Missing parity shards are never needed by the read pipeline
        // (spec §4.5 only ever decodes the k data shards), so they are
        // filled with a placeholder rather than re-encoded.
        for i in 0..m {
            if let Some(data) = shards[k + i] {
                all_shards.push(data.to_vec());
            } else {
                all_shards.push(vec![0u8; shard_size]);
            }
        }

        Ok(all_shards)
    }

    fn verify(&self, shards: &[&[u8]]) -> BackendResult<bool> {
        let k = self.data_shards as usize;
        let m = self.parity_shards as usize;

        if shards.len() != k + m {
            return Ok(false);
        }

        if let Some(first_len) = shards.first().map(|s| s.len()) {
            if !shards.iter().all(|s| s.len() == first_len) {
                return Ok(false);
            }

            let data_shards: Vec<&[u8]> = shards[..k].to_vec();
            let encoded = self.encode(&data_shards, first_len)?;

            for i in 0..m {
                if encoded[k + i] != shards[k + i] {
                    return Ok(false);
                }
            }
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> RustSimdBackend {
        RustSimdBackend::new(4, 2).unwrap()
    }

    #[test]
    fn encode_produces_k_plus_m_shards() {
        let backend = backend();
        let data = vec![vec![1u8; 16], vec![2u8; 16], vec![3u8; 16], vec![4u8; 16]];
        let refs: Vec<&[u8]> = data.iter().map(Vec::as_slice).collect();
        let shards = backend.encode(&refs, 16).unwrap();
        assert_eq!(shards.len(), 6);
    }

    #[test]
    fn decode_recovers_missing_data_shard() {
        let backend = backend();
        let data = vec![vec![1u8; 16], vec![2u8; 16], vec![3u8; 16], vec![4u8; 16]];
        let refs: Vec<&[u8]> = data.iter().map(Vec::as_slice).collect();
        let shards = backend.encode(&refs, 16).unwrap();

        let mut opts: Vec<Option<&[u8]>> = shards.iter().map(|s| Some(s.as_slice())).collect();
        opts[1] = None;

        let decoded = backend.decode(&opts, 16, &[1]).unwrap();
        assert_eq!(decoded[1], data[1]);
    }

    #[test]
    fn decode_fails_below_k_available() {
        let backend = backend();
        let shards: Vec<Option<&[u8]>> = vec![Some(&[0u8; 16]), Some(&[0u8; 16]), None, None, None, None];
        let err = backend.decode(&shards, 16, &[2, 3, 4, 5]).unwrap_err();
        assert!(matches!(err, ErasureError::InsufficientShards { .. }));
    }
}
