//! Shard type for erasure coded data

use bytes::Bytes;

/// One of the `M` shards produced by [`crate::ErasureCodec::encode`],
/// paired with its index (0..M-1) so callers can carry it through
/// placement and transport without losing positional information.
#[derive(Clone, Debug)]
pub struct Shard {
    pub index: u8,
    pub bytes: Bytes,
}

impl Shard {
    #[must_use]
    pub fn new(index: u8, bytes: impl Into<Bytes>) -> Self {
        Self {
            index,
            bytes: bytes.into(),
        }
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shard_size() {
        let shard = Shard::new(0, Bytes::from_static(b"test data"));
        assert_eq!(shard.size(), 9);
        assert_eq!(shard.index, 0);
    }
}
