//! Backend factory for creating erasure coding implementations
//!
//! Kept as a separate seam (mirroring the teacher's factory module) even
//! though only one backend is ever selected — it is the natural place to
//! add a second backend later without touching `ErasureCodec`.

use super::{BackendCapabilities, ErasureBackend, RustSimdBackend};
use crate::ErasureError;
use std::sync::Arc;

/// Configuration for creating a backend.
#[derive(Clone, Debug)]
pub struct BackendConfig {
    pub data_shards: u8,
    pub parity_shards: u8,
}

impl BackendConfig {
    #[must_use]
    pub const fn mds(data_shards: u8, parity_shards: u8) -> Self {
        Self {
            data_shards,
            parity_shards,
        }
    }
}

pub struct BackendFactory;

impl BackendFactory {
    pub fn create_mds(config: &BackendConfig) -> Result<Arc<dyn ErasureBackend>, ErasureError> {
        Ok(Arc::new(RustSimdBackend::new(
            config.data_shards,
            config.parity_shards,
        )?))
    }

    #[must_use]
    pub fn available_backends() -> Vec<BackendCapabilities> {
        vec![BackendCapabilities {
            name: "rust_simd",
            supports_simd: true,
            max_data_shards: 255,
            max_parity_shards: 255,
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_mds_backend() {
        let config = BackendConfig::mds(4, 6 - 4);
        let backend = BackendFactory::create_mds(&config).unwrap();

        assert_eq!(backend.data_shards(), 4);
        assert_eq!(backend.parity_shards(), 2);
        assert_eq!(backend.total_shards(), 6);
    }

    #[test]
    fn test_available_backends() {
        let backends = BackendFactory::available_backends();
        assert!(backends.iter().any(|b| b.name == "rust_simd"));
    }
}
