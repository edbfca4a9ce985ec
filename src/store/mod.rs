/// Store coordinator owning the bookmark and sample stores
///
/// Two `SignalDb` instances live under one working directory:
///
/// - `<dir>/bookmark`: consumer checkpoints keyed by consumer-chosen strings,
///   never expired by the store-wide TTL
/// - `<dir>/sample`: telemetry records keyed by monotonic autokeys, expired
///   after `ttl`
///
/// Point reads and writes go straight to the engine. Only eviction and the
/// in-use watermark take the coordinator lock.
///
/// ## Usage
///
/// ```rust,ignore
/// use signalspool::store::DbStore;
///
/// let store = DbStore::open("data/store", Duration::from_secs(7200))?;
/// let key = store.write_signal(&record)?;
/// let (bookmark, found) = store.get_bookmark("remote-write");
/// ```
pub mod evictor;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::codec::{Bookmark, Record};
use crate::db::{DbError, SignalDb};
use crate::humanize::ByteSize;
use crate::observability::{MetricsSnapshot, StoreMetrics};

pub use evictor::run_evictor;

const BOOKMARK_DIR: &str = "bookmark";
const SAMPLE_DIR: &str = "sample";

/// Key a consumer starts from when it has no bookmark yet
pub const FIRST_KEY: u64 = 1;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Db(#[from] DbError),
}

pub type Result<T> = std::result::Result<T, StoreError>;

struct Retention {
    oldest_in_use_key: u64,
}

pub struct DbStore {
    directory: PathBuf,
    ttl: Duration,
    bookmarks: SignalDb,
    samples: SignalDb,
    retention: Mutex<Retention>,
    metrics: StoreMetrics,
}

impl DbStore {
    /// Open or create both stores under `directory`
    pub fn open<P: AsRef<Path>>(directory: P, ttl: Duration) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        info!(ttl_secs = ttl.as_secs(), "Opening DbStore at: {}", directory.display());

        let bookmarks = SignalDb::open(directory.join(BOOKMARK_DIR), Duration::ZERO)?;
        let samples = SignalDb::open(directory.join(SAMPLE_DIR), ttl)?;

        Ok(Self {
            directory,
            ttl,
            bookmarks,
            samples,
            retention: Mutex::new(Retention {
                oldest_in_use_key: 0,
            }),
            metrics: StoreMetrics::new(),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn write_bookmark(&self, key: &str, bookmark: &Bookmark) -> Result<()> {
        self.bookmarks.write_value(
            key.as_bytes(),
            &Record::Bookmark(bookmark.clone()),
            Duration::ZERO,
        )?;
        debug!(consumer = key, bookmark = bookmark.key, "Bookmark written");
        Ok(())
    }

    /// Fetch a consumer's bookmark
    ///
    /// A missing or unreadable bookmark yields `(Bookmark { key: 1 }, false)`,
    /// meaning "start from the beginning".
    pub fn get_bookmark(&self, key: &str) -> (Bookmark, bool) {
        match self.bookmarks.get_by_string(key) {
            Ok(Some(Record::Bookmark(bookmark))) => (bookmark, true),
            Ok(Some(other)) => {
                warn!(consumer = key, kind = %other.kind(), "Bookmark key holds a non-bookmark record");
                (Bookmark::at(FIRST_KEY), false)
            }
            Ok(None) => (Bookmark::at(FIRST_KEY), false),
            Err(err) => {
                warn!(consumer = key, %err, "Failed to read bookmark");
                (Bookmark::at(FIRST_KEY), false)
            }
        }
    }

    /// Append a record to the sample store and return its key
    pub fn write_signal(&self, record: &Record) -> Result<u64> {
        let start = Instant::now();
        let key = self.samples.write_with_autokey(record, self.ttl)?;
        self.metrics.observe_write(start.elapsed(), key);
        debug!(key, "Writing signal to store");
        Ok(key)
    }

    /// Point lookup of a sample
    ///
    /// Read failures are logged and reported as not found; the caller can move
    /// on to another key.
    pub fn get_signal(&self, key: u64) -> Option<Record> {
        let start = Instant::now();
        let result = self.samples.get_by_key(key);
        self.metrics.observe_read(start.elapsed());

        match result {
            Ok(value) => value,
            Err(err) => {
                error!(key, %err, "Error finding key");
                None
            }
        }
    }

    pub fn oldest_key(&self) -> Option<u64> {
        self.samples.oldest_key().unwrap_or_else(|err| {
            warn!(%err, "Failed to read oldest key");
            None
        })
    }

    pub fn next_key(&self, key: u64) -> Option<u64> {
        self.samples.next_key(key).unwrap_or_else(|err| {
            warn!(key, %err, "Failed to read next key");
            None
        })
    }

    /// Record the lowest key still referenced by a live consumer
    pub fn update_oldest_key(&self, key: u64) {
        self.retention.lock().oldest_in_use_key = key;
    }

    pub fn oldest_in_use_key(&self) -> u64 {
        self.retention.lock().oldest_in_use_key
    }

    /// Run TTL eviction on both stores
    ///
    /// Age alone decides what is removed; the in-use watermark is not consulted.
    /// A failure on one store is logged and does not stop the other.
    pub fn evict(&self) -> EvictionStats {
        let _guard = self.retention.lock();
        let start = Instant::now();

        let bookmarks_evicted = self.bookmarks.evict().unwrap_or_else(|err| {
            error!(%err, "Failure evicting bookmark db");
            0
        });
        let samples_evicted = self.samples.evict().unwrap_or_else(|err| {
            error!(%err, "Failure evicting sample db");
            0
        });

        let stats = EvictionStats {
            bookmarks_evicted,
            samples_evicted,
        };
        self.metrics
            .observe_eviction(start.elapsed(), bookmarks_evicted + samples_evicted);
        info!(?stats, "Eviction completed");
        stats
    }

    /// Exact number of stored samples; zero if the store cannot be walked
    pub fn key_count(&self) -> u64 {
        self.samples.key_count().map(|n| n as u64).unwrap_or_else(|err| {
            warn!(%err, "Failed to count sample keys");
            0
        })
    }

    /// Total bytes under the working directory
    pub fn file_size(&self) -> u64 {
        dir_size(&self.directory)
    }

    pub fn sample_count(&self) -> u64 {
        self.samples.series_count() as u64
    }

    pub fn average_compression_ratio(&self) -> f64 {
        self.samples.average_compression_ratio()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Aggregate telemetry (for debugging/monitoring)
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            key_count: self.key_count(),
            sample_count: self.sample_count(),
            file_size: ByteSize(self.file_size()),
            average_compression_ratio: self.average_compression_ratio(),
            oldest_key: self.oldest_key(),
            oldest_in_use_key: self.oldest_in_use_key(),
            ttl_secs: self.ttl.as_secs(),
            metrics: self.metrics(),
        }
    }

    /// Flush both stores to disk
    pub fn persist(&self) -> Result<()> {
        self.bookmarks.persist()?;
        self.samples.persist()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EvictionStats {
    pub bookmarks_evicted: usize,
    pub samples_evicted: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub key_count: u64,
    pub sample_count: u64,
    pub file_size: ByteSize,
    pub average_compression_ratio: f64,
    pub oldest_key: Option<u64>,
    pub oldest_in_use_key: u64,
    pub ttl_secs: u64,
    pub metrics: MetricsSnapshot,
}

/// Recursive size of all files under `path`; zero on any traversal error
pub fn dir_size(path: &Path) -> u64 {
    fn walk(path: &Path) -> std::io::Result<u64> {
        let mut size = 0;
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            let meta = entry.metadata()?;
            if meta.is_dir() {
                size += walk(&entry.path())?;
            } else {
                size += meta.len();
            }
        }
        Ok(size)
    }

    walk(path).unwrap_or(0)
}
