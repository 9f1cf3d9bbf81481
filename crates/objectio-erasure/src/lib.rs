//! Reed-Solomon erasure coding for the gateway's fixed K=4, M=6 scheme
//! (spec §4.1).
//!
//! ```
//! use objectio_erasure::ErasureCodec;
//!
//! let codec = ErasureCodec::standard().unwrap();
//! let shards = codec.encode(b"Hello, World!").unwrap();
//! assert_eq!(shards.len(), 6);
//! ```

pub mod backend;
pub mod codec;
pub mod shard;

pub use codec::{ErasureCodec, ErasureError};
pub use shard::Shard;

pub use backend::{BackendCapabilities, BackendConfig, BackendFactory, ErasureBackend};

pub mod prelude {
    pub use super::{BackendConfig, BackendFactory, ErasureBackend, ErasureCodec, ErasureError};
}
