//! Transactional metadata store backed by redb (spec §4.7).

use crate::tables::{self, BUCKETS, CONTENT, LATEST, MULTIPART, QUOTAS, VERSIONS};
use crate::types::{
    BucketQuotaRecord, BucketRecord, ContentRecord, MultipartPartRecord, MultipartSessionRecord,
    ObjectVersionRecord, ShardLocationRecord,
};
use dashmap::DashMap;
use objectio_common::{Error, Result};
use redb::{Database, ReadableTable, Table};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

fn to_meta_err(e: impl std::fmt::Display) -> Error {
    Error::MetaStore(e.to_string())
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(to_meta_err)
}

fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    bincode::deserialize(bytes).map_err(to_meta_err)
}

/// Durable record of buckets, object-versions, content-hash -> shards,
/// quotas, and multipart sessions (spec C5).
///
/// Per-bucket advisory locks serialize the quota-check-then-write
/// sequence (spec §4.7, §4.9) and the dedup get-or-create-content path
/// (spec §4.7) against concurrent writers to the same bucket.
pub struct MetaStore {
    db: Database,
    bucket_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl MetaStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::create(path).map_err(to_meta_err)?;
        let store = Self {
            db,
            bucket_locks: DashMap::new(),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let txn = self.db.begin_write().map_err(to_meta_err)?;
        txn.open_table(BUCKETS).map_err(to_meta_err)?;
        txn.open_table(CONTENT).map_err(to_meta_err)?;
        txn.open_table(VERSIONS).map_err(to_meta_err)?;
        txn.open_table(LATEST).map_err(to_meta_err)?;
        txn.open_table(QUOTAS).map_err(to_meta_err)?;
        txn.open_table(MULTIPART).map_err(to_meta_err)?;
        txn.commit().map_err(to_meta_err)?;
        Ok(())
    }

    /// Acquire the advisory lock for a bucket. Held across the
    /// quota-check + dedup + commit span of a single write (spec §4.7).
    pub fn bucket_lock(&self, bucket: &str) -> Arc<Mutex<()>> {
        self.bucket_locks
            .entry(bucket.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    // ---- Buckets ----

    pub fn get_bucket(&self, name: &str) -> Result<Option<BucketRecord>> {
        let txn = self.db.begin_read().map_err(to_meta_err)?;
        let table = txn.open_table(BUCKETS).map_err(to_meta_err)?;
        match table.get(name).map_err(to_meta_err)? {
            Some(bytes) => Ok(Some(decode(bytes.value())?)),
            None => Ok(None),
        }
    }

    /// Idempotent: returns the existing row if the bucket already exists,
    /// ignoring `versioning` in that case.
    pub fn create_bucket(&self, name: &str, versioning: bool, now: u64) -> Result<BucketRecord> {
        let txn = self.db.begin_write().map_err(to_meta_err)?;
        let record = {
            let mut table = txn.open_table(BUCKETS).map_err(to_meta_err)?;
            if let Some(existing) = table.get(name).map_err(to_meta_err)? {
                decode(existing.value())?
            } else {
                let record = BucketRecord {
                    name: name.to_string(),
                    versioning,
                    created_at: now,
                };
                table
                    .insert(name, encode(&record)?.as_slice())
                    .map_err(to_meta_err)?;
                record
            }
        };
        txn.commit().map_err(to_meta_err)?;
        Ok(record)
    }

    pub fn list_buckets(&self) -> Result<Vec<BucketRecord>> {
        let txn = self.db.begin_read().map_err(to_meta_err)?;
        let table = txn.open_table(BUCKETS).map_err(to_meta_err)?;
        table
            .iter()
            .map_err(to_meta_err)?
            .map(|entry| {
                let (_, v) = entry.map_err(to_meta_err)?;
                decode(v.value())
            })
            .collect()
    }

    // ---- Content (dedup) ----

    pub fn get_content(&self, content_hash: &str) -> Result<Option<ContentRecord>> {
        let txn = self.db.begin_read().map_err(to_meta_err)?;
        let table = txn.open_table(CONTENT).map_err(to_meta_err)?;
        match table.get(content_hash).map_err(to_meta_err)? {
            Some(bytes) => Ok(Some(decode(bytes.value())?)),
            None => Ok(None),
        }
    }

    /// Table-level primitive: load the `ContentRow` for `content_hash`
    /// within an already-open table, creating it with refcount=1 if
    /// absent. Returns `(record, created)`.
    fn get_or_create_content_row(
        table: &mut Table<'_, &str, &[u8]>,
        content_hash: &str,
        size: u64,
        shard_layout: Vec<ShardLocationRecord>,
    ) -> Result<(ContentRecord, bool)> {
        if let Some(existing) = table.get(content_hash).map_err(to_meta_err)? {
            Ok((decode(existing.value())?, false))
        } else {
            let record = ContentRecord {
                content_hash: content_hash.to_string(),
                size,
                shard_layout,
                refcount: 1,
            };
            table
                .insert(content_hash, encode(&record)?.as_slice())
                .map_err(to_meta_err)?;
            Ok((record, true))
        }
    }

    /// Table-level primitive: bump refcount within an already-open table.
    fn bump_content_refcount_row(
        table: &mut Table<'_, &str, &[u8]>,
        content_hash: &str,
    ) -> Result<ContentRecord> {
        let existing = table
            .get(content_hash)
            .map_err(to_meta_err)?
            .ok_or_else(|| Error::internal(format!("content row missing: {content_hash}")))?;
        let mut record: ContentRecord = decode(existing.value())?;
        drop(existing);
        record.refcount += 1;
        table
            .insert(content_hash, encode(&record)?.as_slice())
            .map_err(to_meta_err)?;
        Ok(record)
    }

    /// Table-level primitive: decrement refcount within an already-open
    /// table; if it reaches zero, delete the row and return its shard
    /// layout for the caller to clean up (spec §4.6, §4.10). Returns
    /// `None` if the row survives or was already gone.
    fn decr_content_refcount_row(
        table: &mut Table<'_, &str, &[u8]>,
        content_hash: &str,
    ) -> Result<Option<Vec<ShardLocationRecord>>> {
        let Some(existing) = table.get(content_hash).map_err(to_meta_err)? else {
            return Ok(None);
        };
        let mut record: ContentRecord = decode(existing.value())?;
        drop(existing);
        record.refcount = record.refcount.saturating_sub(1);
        if record.refcount == 0 {
            table.remove(content_hash).map_err(to_meta_err)?;
            Ok(Some(record.shard_layout))
        } else {
            table
                .insert(content_hash, encode(&record)?.as_slice())
                .map_err(to_meta_err)?;
            Ok(None)
        }
    }

    /// Table-level primitive: insert a new version row and atomically
    /// flip the prior latest (if any) to `is_latest=false` (spec §3,
    /// §4.4 step 10).
    #[allow(clippy::too_many_arguments)]
    fn insert_version_row(
        versions: &mut Table<'_, &str, &[u8]>,
        latest: &mut Table<'_, &str, &str>,
        bucket: &str,
        key: &str,
        version_id: &str,
        size: u64,
        content_hash: &str,
        now: u64,
    ) -> Result<ObjectVersionRecord> {
        let record = ObjectVersionRecord {
            bucket: bucket.to_string(),
            key: key.to_string(),
            version_id: version_id.to_string(),
            size,
            content_hash: content_hash.to_string(),
            is_latest: true,
            created_at: now,
        };

        let latest_k = tables::latest_key(bucket, key);
        if let Some(prev_id) = latest
            .get(latest_k.as_str())
            .map_err(to_meta_err)?
            .map(|v| v.value().to_string())
        {
            let prev_vk = tables::version_key(bucket, key, &prev_id);
            if let Some(prev_bytes) = versions.get(prev_vk.as_str()).map_err(to_meta_err)? {
                let mut prev: ObjectVersionRecord = decode(prev_bytes.value())?;
                drop(prev_bytes);
                prev.is_latest = false;
                versions
                    .insert(prev_vk.as_str(), encode(&prev)?.as_slice())
                    .map_err(to_meta_err)?;
            }
        }

        let vk = tables::version_key(bucket, key, version_id);
        versions
            .insert(vk.as_str(), encode(&record)?.as_slice())
            .map_err(to_meta_err)?;
        latest
            .insert(latest_k.as_str(), version_id)
            .map_err(to_meta_err)?;
        Ok(record)
    }

    /// Load the `ContentRow` for `content_hash`, creating it with
    /// refcount=1 if absent. Returns `(record, created)`.
    pub fn get_or_create_content(
        &self,
        content_hash: &str,
        size: u64,
        shard_layout: Vec<ShardLocationRecord>,
    ) -> Result<(ContentRecord, bool)> {
        let txn = self.db.begin_write().map_err(to_meta_err)?;
        let result = {
            let mut table = txn.open_table(CONTENT).map_err(to_meta_err)?;
            Self::get_or_create_content_row(&mut table, content_hash, size, shard_layout)?
        };
        txn.commit().map_err(to_meta_err)?;
        Ok(result)
    }

    pub fn incr_content_refcount(&self, content_hash: &str) -> Result<ContentRecord> {
        let txn = self.db.begin_write().map_err(to_meta_err)?;
        let record = {
            let mut table = txn.open_table(CONTENT).map_err(to_meta_err)?;
            Self::bump_content_refcount_row(&mut table, content_hash)?
        };
        txn.commit().map_err(to_meta_err)?;
        Ok(record)
    }

    /// Decrement refcount; if it reaches zero, delete the row and
    /// return its shard layout for the caller to clean up (spec §4.6,
    /// §4.10). Returns `None` if the row survives or was already gone.
    pub fn decr_content_refcount_maybe_delete(
        &self,
        content_hash: &str,
    ) -> Result<Option<Vec<ShardLocationRecord>>> {
        let txn = self.db.begin_write().map_err(to_meta_err)?;
        let freed = {
            let mut table = txn.open_table(CONTENT).map_err(to_meta_err)?;
            Self::decr_content_refcount_row(&mut table, content_hash)?
        };
        txn.commit().map_err(to_meta_err)?;
        Ok(freed)
    }

    // ---- Object versions ----

    /// Insert a new version row and atomically flip the prior latest
    /// (if any) to `is_latest=false` (spec §3, §4.4 step 10).
    #[allow(clippy::too_many_arguments)]
    pub fn put_object_version(
        &self,
        bucket: &str,
        key: &str,
        version_id: &str,
        size: u64,
        content_hash: &str,
        now: u64,
    ) -> Result<ObjectVersionRecord> {
        let txn = self.db.begin_write().map_err(to_meta_err)?;
        let record = {
            let mut versions = txn.open_table(VERSIONS).map_err(to_meta_err)?;
            let mut latest = txn.open_table(LATEST).map_err(to_meta_err)?;
            Self::insert_version_row(
                &mut versions,
                &mut latest,
                bucket,
                key,
                version_id,
                size,
                content_hash,
                now,
            )?
        };
        txn.commit().map_err(to_meta_err)?;
        Ok(record)
    }

    /// Dedup-hit write path (spec §4.4 step 4): increment the
    /// `ContentRow` refcount and insert the new `ObjectVersion` in a
    /// single transaction, so a crash between the two never leaves an
    /// inflated refcount with no corresponding version row.
    #[allow(clippy::too_many_arguments)]
    pub fn commit_dedup_write(
        &self,
        content_hash: &str,
        bucket: &str,
        key: &str,
        version_id: &str,
        size: u64,
        now: u64,
    ) -> Result<ObjectVersionRecord> {
        let txn = self.db.begin_write().map_err(to_meta_err)?;
        let record = {
            {
                let mut content = txn.open_table(CONTENT).map_err(to_meta_err)?;
                Self::bump_content_refcount_row(&mut content, content_hash)?;
            }
            let mut versions = txn.open_table(VERSIONS).map_err(to_meta_err)?;
            let mut latest = txn.open_table(LATEST).map_err(to_meta_err)?;
            Self::insert_version_row(
                &mut versions,
                &mut latest,
                bucket,
                key,
                version_id,
                size,
                content_hash,
                now,
            )?
        };
        txn.commit().map_err(to_meta_err)?;
        Ok(record)
    }

    /// Dedup-miss write path (spec §4.4 step 10): insert the
    /// `ContentRow` (refcount=1) and the new `ObjectVersion` in a single
    /// transaction.
    #[allow(clippy::too_many_arguments)]
    pub fn commit_new_content_write(
        &self,
        content_hash: &str,
        size: u64,
        shard_layout: Vec<ShardLocationRecord>,
        bucket: &str,
        key: &str,
        version_id: &str,
        now: u64,
    ) -> Result<ObjectVersionRecord> {
        let txn = self.db.begin_write().map_err(to_meta_err)?;
        let record = {
            {
                let mut content = txn.open_table(CONTENT).map_err(to_meta_err)?;
                Self::get_or_create_content_row(&mut content, content_hash, size, shard_layout)?;
            }
            let mut versions = txn.open_table(VERSIONS).map_err(to_meta_err)?;
            let mut latest = txn.open_table(LATEST).map_err(to_meta_err)?;
            Self::insert_version_row(
                &mut versions,
                &mut latest,
                bucket,
                key,
                version_id,
                size,
                content_hash,
                now,
            )?
        };
        txn.commit().map_err(to_meta_err)?;
        Ok(record)
    }

    /// `version_id = None` resolves to the current latest.
    pub fn get_object_version(
        &self,
        bucket: &str,
        key: &str,
        version_id: Option<&str>,
    ) -> Result<Option<ObjectVersionRecord>> {
        let txn = self.db.begin_read().map_err(to_meta_err)?;
        let versions = txn.open_table(VERSIONS).map_err(to_meta_err)?;

        let resolved_id = match version_id {
            Some(id) => Some(id.to_string()),
            None => {
                let latest = txn.open_table(LATEST).map_err(to_meta_err)?;
                latest
                    .get(tables::latest_key(bucket, key).as_str())
                    .map_err(to_meta_err)?
                    .map(|v| v.value().to_string())
            }
        };
        let Some(resolved_id) = resolved_id else {
            return Ok(None);
        };
        let vk = tables::version_key(bucket, key, &resolved_id);
        match versions.get(vk.as_str()).map_err(to_meta_err)? {
            Some(bytes) => Ok(Some(decode(bytes.value())?)),
            None => Ok(None),
        }
    }

    /// Latest version of every key in `bucket`.
    pub fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectVersionRecord>> {
        let txn = self.db.begin_read().map_err(to_meta_err)?;
        let versions = txn.open_table(VERSIONS).map_err(to_meta_err)?;
        let prefix = tables::version_prefix(bucket);
        let mut out = Vec::new();
        for entry in versions.iter().map_err(to_meta_err)? {
            let (k, v) = entry.map_err(to_meta_err)?;
            if !k.value().starts_with(prefix.as_str()) {
                continue;
            }
            let record: ObjectVersionRecord = decode(v.value())?;
            if record.is_latest {
                out.push(record);
            }
        }
        Ok(out)
    }

    /// All non-latest versions older than `cutoff` (spec §4.10 GC loop),
    /// across every bucket.
    pub fn list_stale_versions(&self, cutoff: u64) -> Result<Vec<ObjectVersionRecord>> {
        let txn = self.db.begin_read().map_err(to_meta_err)?;
        let versions = txn.open_table(VERSIONS).map_err(to_meta_err)?;
        let mut out = Vec::new();
        for entry in versions.iter().map_err(to_meta_err)? {
            let (_, v) = entry.map_err(to_meta_err)?;
            let record: ObjectVersionRecord = decode(v.value())?;
            if !record.is_latest && record.created_at < cutoff {
                out.push(record);
            }
        }
        Ok(out)
    }

    /// Table-level primitive: remove the latest version row of
    /// (bucket, key) without promoting any prior version.
    fn remove_latest_row(
        versions: &mut Table<'_, &str, &[u8]>,
        latest: &mut Table<'_, &str, &str>,
        bucket: &str,
        key: &str,
    ) -> Result<Option<ObjectVersionRecord>> {
        let latest_k = tables::latest_key(bucket, key);
        let Some(version_id) = latest
            .get(latest_k.as_str())
            .map_err(to_meta_err)?
            .map(|v| v.value().to_string())
        else {
            return Ok(None);
        };
        latest.remove(latest_k.as_str()).map_err(to_meta_err)?;
        let vk = tables::version_key(bucket, key, &version_id);
        versions
            .remove(vk.as_str())
            .map_err(to_meta_err)?
            .map(|v| decode(v.value()))
            .transpose()
    }

    /// Remove the latest version row of (bucket, key) without promoting
    /// any prior version (spec §4.6): a subsequent GET returns
    /// `NotFound` unless a version-id is supplied.
    pub fn delete_latest(&self, bucket: &str, key: &str) -> Result<Option<ObjectVersionRecord>> {
        let txn = self.db.begin_write().map_err(to_meta_err)?;
        let removed = {
            let mut versions = txn.open_table(VERSIONS).map_err(to_meta_err)?;
            let mut latest = txn.open_table(LATEST).map_err(to_meta_err)?;
            Self::remove_latest_row(&mut versions, &mut latest, bucket, key)?
        };
        txn.commit().map_err(to_meta_err)?;
        Ok(removed)
    }

    /// Delete pipeline commit (spec §4.6): in one transaction, remove
    /// the latest version row of (bucket, key), then load its
    /// `ContentRow`, decrement refcount, and remove the row if it hits
    /// zero. Returns `None` if there was no latest version; otherwise
    /// the removed version and, if the content row was freed, its
    /// shard layout for the caller to clean up.
    pub fn delete_latest_and_decr_refcount(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<(ObjectVersionRecord, Option<Vec<ShardLocationRecord>>)>> {
        let txn = self.db.begin_write().map_err(to_meta_err)?;
        let outcome = {
            let removed = {
                let mut versions = txn.open_table(VERSIONS).map_err(to_meta_err)?;
                let mut latest = txn.open_table(LATEST).map_err(to_meta_err)?;
                Self::remove_latest_row(&mut versions, &mut latest, bucket, key)?
            };
            match removed {
                Some(removed) => {
                    let freed = {
                        let mut content = txn.open_table(CONTENT).map_err(to_meta_err)?;
                        Self::decr_content_refcount_row(&mut content, &removed.content_hash)?
                    };
                    Some((removed, freed))
                }
                None => None,
            }
        };
        txn.commit().map_err(to_meta_err)?;
        Ok(outcome)
    }

    /// GC commit (spec §4.10): in one transaction, remove a specific
    /// non-latest version row, then decrement its `ContentRow`'s
    /// refcount, removing the row if it hits zero. Returns the freed
    /// shard layout when the content row was removed.
    pub fn delete_stale_version_and_decr_refcount(
        &self,
        bucket: &str,
        key: &str,
        version_id: &str,
        content_hash: &str,
    ) -> Result<Option<Vec<ShardLocationRecord>>> {
        let txn = self.db.begin_write().map_err(to_meta_err)?;
        let freed = {
            {
                let mut versions = txn.open_table(VERSIONS).map_err(to_meta_err)?;
                let vk = tables::version_key(bucket, key, version_id);
                versions.remove(vk.as_str()).map_err(to_meta_err)?;
            }
            let mut content = txn.open_table(CONTENT).map_err(to_meta_err)?;
            Self::decr_content_refcount_row(&mut content, content_hash)?
        };
        txn.commit().map_err(to_meta_err)?;
        Ok(freed)
    }

    // ---- Quotas ----

    pub fn get_quota(&self, bucket: &str) -> Result<Option<BucketQuotaRecord>> {
        let txn = self.db.begin_read().map_err(to_meta_err)?;
        let table = txn.open_table(QUOTAS).map_err(to_meta_err)?;
        match table.get(bucket).map_err(to_meta_err)? {
            Some(bytes) => Ok(Some(decode(bytes.value())?)),
            None => Ok(None),
        }
    }

    pub fn set_quota(&self, bucket: &str, quota: &BucketQuotaRecord) -> Result<()> {
        let txn = self.db.begin_write().map_err(to_meta_err)?;
        {
            let mut table = txn.open_table(QUOTAS).map_err(to_meta_err)?;
            table
                .insert(bucket, encode(quota)?.as_slice())
                .map_err(to_meta_err)?;
        }
        txn.commit().map_err(to_meta_err)?;
        Ok(())
    }

    /// Logical usage: sum of latest-version sizes/count (spec §4.9 —
    /// deduplicated writes still count against quota).
    pub fn bucket_usage(&self, bucket: &str) -> Result<(u64, u64)> {
        let objects = self.list_objects(bucket)?;
        let bytes = objects.iter().map(|o| o.size).sum();
        Ok((bytes, objects.len() as u64))
    }

    // ---- Multipart sessions ----

    pub fn initiate_multipart(
        &self,
        upload_id: &str,
        bucket: &str,
        key: &str,
        now: u64,
    ) -> Result<MultipartSessionRecord> {
        let record = MultipartSessionRecord {
            upload_id: upload_id.to_string(),
            bucket: bucket.to_string(),
            key: key.to_string(),
            initiated_at: now,
            parts: std::collections::HashMap::new(),
        };
        let txn = self.db.begin_write().map_err(to_meta_err)?;
        {
            let mut table = txn.open_table(MULTIPART).map_err(to_meta_err)?;
            table
                .insert(upload_id, encode(&record)?.as_slice())
                .map_err(to_meta_err)?;
        }
        txn.commit().map_err(to_meta_err)?;
        Ok(record)
    }

    pub fn get_multipart(&self, upload_id: &str) -> Result<Option<MultipartSessionRecord>> {
        let txn = self.db.begin_read().map_err(to_meta_err)?;
        let table = txn.open_table(MULTIPART).map_err(to_meta_err)?;
        match table.get(upload_id).map_err(to_meta_err)? {
            Some(bytes) => Ok(Some(decode(bytes.value())?)),
            None => Ok(None),
        }
    }

    pub fn put_multipart_part(
        &self,
        upload_id: &str,
        part: MultipartPartRecord,
    ) -> Result<MultipartSessionRecord> {
        let txn = self.db.begin_write().map_err(to_meta_err)?;
        let record = {
            let mut table = txn.open_table(MULTIPART).map_err(to_meta_err)?;
            let existing = table.get(upload_id).map_err(to_meta_err)?.ok_or_else(|| {
                Error::NotImplemented(format!("no such upload: {upload_id}"))
            })?;
            let mut record: MultipartSessionRecord = decode(existing.value())?;
            drop(existing);
            record.parts.insert(part.part_number, part);
            table
                .insert(upload_id, encode(&record)?.as_slice())
                .map_err(to_meta_err)?;
            record
        };
        txn.commit().map_err(to_meta_err)?;
        Ok(record)
    }

    /// Deletes the session (complete and abort both terminate it; spec §3).
    pub fn remove_multipart(&self, upload_id: &str) -> Result<Option<MultipartSessionRecord>> {
        let txn = self.db.begin_write().map_err(to_meta_err)?;
        let removed = {
            let mut table = txn.open_table(MULTIPART).map_err(to_meta_err)?;
            table
                .remove(upload_id)
                .map_err(to_meta_err)?
                .map(|v| decode(v.value()))
                .transpose()?
        };
        txn.commit().map_err(to_meta_err)?;
        Ok(removed)
    }
}
