//! Stored record types for metadata persistence (spec §3).
//!
//! These are serialized to redb via bincode, one variant per table in
//! [`crate::tables`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// `Bucket` (spec §3): name, versioning flag, creation timestamp.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BucketRecord {
    pub name: String,
    pub versioning: bool,
    pub created_at: u64,
}

/// One shard's placement within a `ContentRow`'s shard layout.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShardLocationRecord {
    pub index: u8,
    pub node_id: String,
    pub shard_key: String,
}

/// `ContentRow` (spec §3): content-hash -> {size, shard-layout, refcount}.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContentRecord {
    pub content_hash: String,
    pub size: u64,
    pub shard_layout: Vec<ShardLocationRecord>,
    pub refcount: u64,
}

/// `ObjectVersion` (spec §3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ObjectVersionRecord {
    pub bucket: String,
    pub key: String,
    pub version_id: String,
    pub size: u64,
    pub content_hash: String,
    pub is_latest: bool,
    pub created_at: u64,
}

/// `BucketQuota` (spec §3). Absent row means apply defaults.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BucketQuotaRecord {
    pub max_size_bytes: u64,
    pub max_objects: u64,
}

/// One part of an in-progress multipart upload.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MultipartPartRecord {
    pub part_number: u32,
    pub size: u64,
    pub content_hash: String,
}

/// `MultipartSession` (spec §3, §4.12): upload-id -> {bucket, key, parts}.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MultipartSessionRecord {
    pub upload_id: String,
    pub bucket: String,
    pub key: String,
    pub initiated_at: u64,
    pub parts: HashMap<u32, MultipartPartRecord>,
}
