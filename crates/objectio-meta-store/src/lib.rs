//! ObjectIO metadata store: durable bucket/version/content/quota/
//! multipart state behind redb transactions (spec §4.7, C5).
//!
//! A single gateway is assumed to own this store (spec Non-goals
//! exclude distributed consensus across gateway replicas), so there is
//! no Raft layer here — just transactions and per-bucket advisory locks.

pub mod store;
pub mod tables;
pub mod types;

pub use store::MetaStore;
pub use types::{
    BucketQuotaRecord, BucketRecord, ContentRecord, MultipartPartRecord, MultipartSessionRecord,
    ObjectVersionRecord, ShardLocationRecord,
};
