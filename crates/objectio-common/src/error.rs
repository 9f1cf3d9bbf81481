//! Error types for the gateway
//!
//! This module defines the common error types used throughout the system.

use crate::types::{BucketNameError, ObjectKeyError};
use thiserror::Error;

/// Common result type for gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Gateway error taxonomy (see spec §7).
#[derive(Debug, Error)]
pub enum Error {
    #[error("bucket not found: {0}")]
    BucketNotFound(String),

    #[error("object not found: {bucket}/{key}")]
    ObjectNotFound { bucket: String, key: String },

    #[error("version not found: {bucket}/{key}@{version_id}")]
    VersionNotFound {
        bucket: String,
        key: String,
        version_id: String,
    },

    #[error("no such upload: {upload_id}")]
    NoSuchUpload { upload_id: String },

    #[error("quota exceeded: {dimension} used {used} limit {limit}")]
    QuotaExceeded {
        dimension: QuotaDimension,
        used: u64,
        limit: u64,
    },

    #[error("quorum not met: {succeeded}/{required} shards committed")]
    QuorumNotMet { succeeded: usize, required: usize },

    #[error("degraded unreadable: only {available} of {required} shards retrievable")]
    DegradedUnreadable { available: usize, required: usize },

    #[error("insufficient nodes for placement: have {available}, need {required}")]
    CapacityError { available: usize, required: usize },

    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error("invalid bucket name: {0}")]
    InvalidBucketName(#[from] BucketNameError),

    #[error("invalid object key: {0}")]
    InvalidObjectKey(#[from] ObjectKeyError),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("erasure coding error: {0}")]
    Erasure(String),

    #[error("metadata store error: {0}")]
    MetaStore(String),

    #[error("not implemented: {0}")]
    NotImplemented(String),
}

/// Which quota dimension a `QuotaExceeded` violates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDimension {
    Bytes,
    Objects,
}

impl std::fmt::Display for QuotaDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bytes => write!(f, "bytes"),
            Self::Objects => write!(f, "objects"),
        }
    }
}

impl Error {
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    #[must_use]
    pub fn not_implemented(feature: impl Into<String>) -> Self {
        Self::NotImplemented(feature.into())
    }

    #[must_use]
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    /// Errors the client may reasonably retry unchanged.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::QuorumNotMet { .. } | Self::DegradedUnreadable { .. })
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::BucketNotFound(_)
                | Self::ObjectNotFound { .. }
                | Self::VersionNotFound { .. }
                | Self::NoSuchUpload { .. }
        )
    }

    /// HTTP status surfaced by the gateway API, per spec §7.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::BucketNotFound(_)
            | Self::ObjectNotFound { .. }
            | Self::VersionNotFound { .. }
            | Self::NoSuchUpload { .. } => 404,

            Self::BadRequest(_) | Self::InvalidBucketName(_) | Self::InvalidObjectKey(_) => 400,

            Self::QuorumNotMet { .. } | Self::DegradedUnreadable { .. } => 502,

            Self::CapacityError { .. } | Self::Internal(_) | Self::Erasure(_) | Self::MetaStore(_) => 500,

            Self::NotImplemented(_) => 501,

            Self::QuotaExceeded { .. } => 507,
        }
    }
}
