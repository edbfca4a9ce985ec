/// Ordered key-value wrapper used for the sample and bookmark stores
///
/// `SignalDb` is a thin contract over a Fjall keyspace (an embedded LSM
/// key-value engine with ordered keys). It provides:
///
/// - Point get/put/delete of codec-encoded records, snappy compressed at rest
/// - Monotonic autokey allocation that survives restarts
/// - Ordered key traversal (`oldest_key`, `next_key`)
/// - TTL eviction driven by an expiry index, so eviction is an ordered range
///   walk instead of a full scan
///
/// See [`keys`] for the partition layout.
pub mod keys;

use std::io;
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info};

use crate::codec::{CodecError, Record};
use keys::{
    META_NEXT_KEY, decode_auto_key, decode_expiry_key, decode_stored_value, encode_auto_key,
    encode_expiry_key, encode_stored_value,
};

/// Expired entries removed per committed batch during eviction
const EVICT_BATCH_SIZE: usize = 4096;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Fjall error: {0}")]
    Fjall(#[from] fjall::Error),

    #[error("Record codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Snappy error: {0}")]
    Snappy(#[from] snap::Error),

    #[error("Corrupt stored value for key {0:?}")]
    CorruptValue(Vec<u8>),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// SignalDb stores codec records in a Fjall keyspace
///
/// Architecture:
/// - `data` partition: key -> expiry header + snappy(record)
/// - `expiry` partition: expires_at ++ key -> () (eviction index)
/// - `meta` partition: "next_key" -> u64 (autokey counter)
///
/// A write with `ttl = 0` falls back to the store-wide `default_ttl`; when that
/// is zero too, the entry never expires.
pub struct SignalDb {
    path: PathBuf,
    keyspace: Keyspace,
    data: PartitionHandle,
    expiry: PartitionHandle,
    meta: PartitionHandle,
    default_ttl: Duration,
    next_key: Mutex<u64>,
    /// Serializes read-modify-write of existing keys against eviction
    write_lock: Mutex<()>,
    uncompressed_bytes: AtomicU64,
    compressed_bytes: AtomicU64,
}

impl SignalDb {
    /// Open or create a SignalDb at the specified path
    pub fn open<P: AsRef<Path>>(path: P, default_ttl: Duration) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        info!("Opening SignalDb at: {}", path.display());

        std::fs::create_dir_all(&path)?;
        let keyspace = Config::new(&path).open()?;

        let data = keyspace.open_partition("data", PartitionCreateOptions::default())?;
        let expiry = keyspace.open_partition("expiry", PartitionCreateOptions::default())?;
        let meta = keyspace.open_partition("meta", PartitionCreateOptions::default())?;

        // The persisted counter survives eviction of every key; the last key
        // covers a counter write lost before it reached disk.
        let persisted = meta
            .get(META_NEXT_KEY)?
            .and_then(|bytes| decode_auto_key(&bytes))
            .unwrap_or(1);
        let after_last = data
            .last_key_value()?
            .and_then(|(key, _)| decode_auto_key(&key))
            .map(|k| k.saturating_add(1))
            .unwrap_or(1);
        let next_key = persisted.max(after_last);

        info!(next_key, "SignalDb opened");

        Ok(Self {
            path,
            keyspace,
            data,
            expiry,
            meta,
            default_ttl,
            next_key: Mutex::new(next_key),
            write_lock: Mutex::new(()),
            uncompressed_bytes: AtomicU64::new(0),
            compressed_bytes: AtomicU64::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Store pre-encoded record bytes under `key`, overwriting any prior value
    pub fn put(&self, key: &[u8], value: &[u8], ttl: Duration) -> Result<()> {
        let expires_at = self.expires_at(ttl);
        let stored = self.compress(expires_at, value)?;

        let _guard = self.write_lock.lock();
        let mut batch = self.keyspace.batch();
        if let Some(previous) = self.data.get(key)? {
            let (old_expiry, _) = decode_stored_value(&previous)
                .ok_or_else(|| DbError::CorruptValue(key.to_vec()))?;
            if old_expiry != 0 {
                batch.remove(&self.expiry, encode_expiry_key(old_expiry, key));
            }
        }
        batch.insert(&self.data, key, stored);
        if expires_at != 0 {
            batch.insert(&self.expiry, encode_expiry_key(expires_at, key), Vec::new());
        }
        batch.commit()?;
        Ok(())
    }

    /// Encode `record` and store it under `key`
    pub fn write_value(&self, key: &[u8], record: &Record, ttl: Duration) -> Result<()> {
        self.put(key, &record.encode(), ttl)
    }

    /// Allocate the next autokey and store `record` under it
    ///
    /// The record, its expiry index entry and the advanced counter are committed
    /// in one batch, so a key is never handed out twice, even across restarts.
    pub fn write_with_autokey(&self, record: &Record, ttl: Duration) -> Result<u64> {
        let expires_at = self.expires_at(ttl);
        let stored = self.compress(expires_at, &record.encode())?;

        let mut next_key = self.next_key.lock();
        let key = *next_key;
        let encoded_key = encode_auto_key(key);

        let mut batch = self.keyspace.batch();
        batch.insert(&self.data, &encoded_key[..], stored);
        if expires_at != 0 {
            batch.insert(&self.expiry, encode_expiry_key(expires_at, &encoded_key), Vec::new());
        }
        batch.insert(&self.meta, META_NEXT_KEY, &encode_auto_key(key + 1)[..]);
        batch.commit()?;

        *next_key = key + 1;
        debug!(key, kind = %record.kind(), "Record written");
        Ok(key)
    }

    /// Fetch the decompressed record bytes stored under `key`
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.data.get(key)? {
            Some(stored) => {
                let (_, compressed) = decode_stored_value(&stored)
                    .ok_or_else(|| DbError::CorruptValue(key.to_vec()))?;
                let raw = snap::raw::Decoder::new().decompress_vec(compressed)?;
                Ok(Some(raw))
            }
            None => Ok(None),
        }
    }

    /// Fetch and decode the record stored under `key`
    pub fn get_value(&self, key: &[u8]) -> Result<Option<Record>> {
        match self.get(key)? {
            Some(raw) => Ok(Some(Record::decode(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn get_by_key(&self, key: u64) -> Result<Option<Record>> {
        self.get_value(&encode_auto_key(key))
    }

    pub fn get_by_string(&self, key: &str) -> Result<Option<Record>> {
        self.get_value(key.as_bytes())
    }

    /// Remove `key` and its expiry index entry. Missing keys are ignored.
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        let _guard = self.write_lock.lock();
        let Some(stored) = self.data.get(key)? else {
            return Ok(());
        };

        let mut batch = self.keyspace.batch();
        if let Some((expires_at, _)) = decode_stored_value(&stored) {
            if expires_at != 0 {
                batch.remove(&self.expiry, encode_expiry_key(expires_at, key));
            }
        }
        batch.remove(&self.data, key);
        batch.commit()?;
        Ok(())
    }

    /// All keys in ascending byte order
    pub fn keys(&self) -> Result<Vec<Vec<u8>>> {
        let mut keys = Vec::new();
        for item in self.data.iter() {
            let (key, _) = item?;
            keys.push(key.to_vec());
        }
        Ok(keys)
    }

    /// Exact number of stored entries (walks the partition)
    pub fn key_count(&self) -> Result<usize> {
        Ok(self.data.len()?)
    }

    /// Estimated number of stored entries, without a scan
    pub fn series_count(&self) -> usize {
        self.data.approximate_len()
    }

    /// Lowest autokey currently stored
    pub fn oldest_key(&self) -> Result<Option<u64>> {
        Ok(self
            .data
            .first_key_value()?
            .and_then(|(key, _)| decode_auto_key(&key)))
    }

    /// Lowest autokey strictly greater than `key`
    pub fn next_key(&self, key: u64) -> Result<Option<u64>> {
        let range: (Bound<[u8; 8]>, Bound<[u8; 8]>) =
            (Bound::Excluded(encode_auto_key(key)), Bound::Unbounded);
        match self.data.range(range).next() {
            Some(item) => {
                let (key, _) = item?;
                Ok(decode_auto_key(&key))
            }
            None => Ok(None),
        }
    }

    /// Uncompressed / compressed bytes over the records written by this process
    pub fn average_compression_ratio(&self) -> f64 {
        let compressed = self.compressed_bytes.load(Ordering::Relaxed);
        if compressed == 0 {
            return 0.0;
        }
        self.uncompressed_bytes.load(Ordering::Relaxed) as f64 / compressed as f64
    }

    /// Remove every entry whose expiry has passed; returns the number removed
    ///
    /// An index entry only evicts its key when the stored value still carries
    /// the same expiry. Entries left behind by an overwrite are dropped alone.
    pub fn evict(&self) -> Result<usize> {
        let now = now_ms();
        let mut evicted = 0;
        let mut stale = 0;
        let _guard = self.write_lock.lock();
        let mut batch = self.keyspace.batch();
        let mut pending = 0;

        for item in self.expiry.iter() {
            let (index_key, _) = item?;
            let Some((expires_at, key)) = decode_expiry_key(&index_key) else {
                batch.remove(&self.expiry, index_key.to_vec());
                pending += 1;
                continue;
            };
            if expires_at > now {
                break;
            }

            let current = self
                .data
                .get(key)?
                .and_then(|stored| decode_stored_value(&stored).map(|(at, _)| at));
            if current == Some(expires_at) {
                batch.remove(&self.data, key.to_vec());
                evicted += 1;
            } else {
                stale += 1;
            }
            batch.remove(&self.expiry, index_key.to_vec());
            pending += 1;

            if pending >= EVICT_BATCH_SIZE {
                batch.commit()?;
                batch = self.keyspace.batch();
                pending = 0;
            }
        }

        if pending > 0 {
            batch.commit()?;
        }

        debug!(evicted, stale, path = %self.path.display(), "Eviction pass finished");
        Ok(evicted)
    }

    /// On-disk footprint reported by the engine
    pub fn disk_space(&self) -> u64 {
        self.keyspace.disk_space()
    }

    /// Flush all writes to disk
    pub fn persist(&self) -> Result<()> {
        self.keyspace.persist(fjall::PersistMode::SyncAll)?;
        Ok(())
    }

    fn expires_at(&self, ttl: Duration) -> u64 {
        let ttl = if ttl.is_zero() { self.default_ttl } else { ttl };
        if ttl.is_zero() {
            return 0;
        }
        now_ms().saturating_add(ttl.as_millis() as u64)
    }

    fn compress(&self, expires_at: u64, value: &[u8]) -> Result<Vec<u8>> {
        let compressed = snap::raw::Encoder::new().compress_vec(value)?;
        self.uncompressed_bytes
            .fetch_add(value.len() as u64, Ordering::Relaxed);
        self.compressed_bytes
            .fetch_add(compressed.len() as u64, Ordering::Relaxed);
        Ok(encode_stored_value(expires_at, &compressed))
    }
}

/// Get current Unix timestamp in milliseconds
fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
