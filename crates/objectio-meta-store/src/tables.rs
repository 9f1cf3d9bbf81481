//! Redb table definitions for persistent metadata storage (spec §3, §4.7).
//!
//! Composite keys are `\0`-joined strings so prefix scans (list buckets'
//! objects, find a key's versions) are plain string range queries.

use redb::TableDefinition;

/// bucket name -> bincode(BucketRecord)
pub const BUCKETS: TableDefinition<&str, &[u8]> = TableDefinition::new("buckets");

/// content hash -> bincode(ContentRecord)
pub const CONTENT: TableDefinition<&str, &[u8]> = TableDefinition::new("content");

/// "{bucket}\0{key}\0{version_id}" -> bincode(ObjectVersionRecord)
pub const VERSIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("versions");

/// "{bucket}\0{key}" -> version_id of the current latest version
pub const LATEST: TableDefinition<&str, &str> = TableDefinition::new("latest");

/// bucket name -> bincode(BucketQuotaRecord)
pub const QUOTAS: TableDefinition<&str, &[u8]> = TableDefinition::new("quotas");

/// upload id -> bincode(MultipartSessionRecord)
pub const MULTIPART: TableDefinition<&str, &[u8]> = TableDefinition::new("multipart");

#[must_use]
pub fn version_key(bucket: &str, key: &str, version_id: &str) -> String {
    format!("{bucket}\0{key}\0{version_id}")
}

#[must_use]
pub fn latest_key(bucket: &str, key: &str) -> String {
    format!("{bucket}\0{key}")
}

#[must_use]
pub fn version_prefix(bucket: &str) -> String {
    format!("{bucket}\0")
}
