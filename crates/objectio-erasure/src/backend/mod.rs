//! Erasure coding backend abstraction
//!
//! Trait-based seam between the codec (padding/shard bookkeeping) and the
//! SIMD implementation, so the codec doesn't need to know how parity is
//! actually computed.

pub mod factory;
pub mod rust_simd;

use crate::ErasureError;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, ErasureError>;

/// Capabilities of an erasure coding backend.
#[derive(Clone, Debug, Default)]
pub struct BackendCapabilities {
    pub name: &'static str,
    pub supports_simd: bool,
    pub max_data_shards: usize,
    pub max_parity_shards: usize,
}

/// Core trait for MDS (Maximum Distance Separable) erasure coding
/// backends, typically Reed-Solomon: any `k` of `k+m` shards reconstruct
/// the data.
pub trait ErasureBackend: Send + Sync {
    fn capabilities(&self) -> BackendCapabilities;

    fn data_shards(&self) -> usize;

    fn parity_shards(&self) -> usize;

    fn total_shards(&self) -> usize {
        self.data_shards() + self.parity_shards()
    }

    fn min_shards_for_decode(&self) -> usize {
        self.data_shards()
    }

    /// Encode `k` equal-sized data shards into `k+m` shards (data first,
    /// then parity, in order).
    fn encode(&self, data_shards: &[&[u8]], shard_size: usize) -> BackendResult<Vec<Vec<u8>>>;

    /// Reconstruct missing shards given at least `k` of the `k+m`
    /// shards present.
    fn decode(
        &self,
        shards: &[Option<&[u8]>],
        shard_size: usize,
        missing_indices: &[usize],
    ) -> BackendResult<Vec<Vec<u8>>>;

    /// Re-encode the data shards and compare against the supplied parity.
    fn verify(&self, shards: &[&[u8]]) -> BackendResult<bool>;
}

pub use factory::{BackendConfig, BackendFactory};
pub use rust_simd::RustSimdBackend;
