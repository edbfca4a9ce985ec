use super::pool::BufferPool;
use parking_lot::RwLock;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info, warn};

const UNCOMMITTED_EXT: &str = "uncommitted";
const COMMITTED_EXT: &str = "committed";

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Snappy error: {0}")]
    Snappy(#[from] snap::Error),

    #[error("Invalid queue handle: {0}")]
    InvalidHandle(String),
}

pub type Result<T> = std::result::Result<T, QueueError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryState {
    Uncommitted,
    Committed,
}

impl EntryState {
    fn extension(self) -> &'static str {
        match self {
            EntryState::Uncommitted => UNCOMMITTED_EXT,
            EntryState::Committed => COMMITTED_EXT,
        }
    }
}

/// Logical name of a queue file: `<index>.uncommitted` or `<index>.committed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    pub index: u64,
    pub state: EntryState,
}

impl Handle {
    pub fn uncommitted(index: u64) -> Self {
        Self {
            index,
            state: EntryState::Uncommitted,
        }
    }

    pub fn committed(index: u64) -> Self {
        Self {
            index,
            state: EntryState::Committed,
        }
    }

    pub fn is_committed(&self) -> bool {
        self.state == EntryState::Committed
    }

    pub fn file_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.index, self.state.extension())
    }
}

impl FromStr for Handle {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || QueueError::InvalidHandle(s.to_string());
        let (index, ext) = s.rsplit_once('.').ok_or_else(invalid)?;
        let state = match ext {
            UNCOMMITTED_EXT => EntryState::Uncommitted,
            COMMITTED_EXT => EntryState::Committed,
            _ => return Err(invalid()),
        };
        let index = index.parse::<u64>().map_err(|_| invalid())?;
        Ok(Self { index, state })
    }
}

/// A committed payload handed out by [`FileQueue::next`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub payload: Vec<u8>,
    pub handle: Handle,
    /// More than one committed entry existed when this one was read.
    pub has_more: bool,
}

struct QueueState {
    directory: PathBuf,
    max_index: u64,
}

/// Directory-backed FIFO of snappy-compressed payloads.
///
/// Entries are written as `<index>.uncommitted` and become visible to readers
/// only once renamed to `<index>.committed`. Uncommitted files left behind by a
/// crash are removed on [`FileQueue::open`].
pub struct FileQueue {
    state: RwLock<QueueState>,
    pool: &'static BufferPool,
}

impl FileQueue {
    /// Open or create a queue in `directory`
    pub fn open<P: AsRef<Path>>(directory: P) -> Result<Self> {
        Self::open_with_pool(directory, BufferPool::global())
    }

    pub fn open_with_pool<P: AsRef<Path>>(directory: P, pool: &'static BufferPool) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        info!("Opening FileQueue at: {}", directory.display());

        fs::create_dir_all(&directory)?;

        let mut max_index = 0;
        let mut discarded = 0;
        for handle in list_handles(&directory)? {
            match handle.state {
                EntryState::Uncommitted => {
                    if let Err(err) = fs::remove_file(directory.join(handle.file_name())) {
                        warn!(%handle, %err, "Failed to discard uncommitted entry");
                    } else {
                        discarded += 1;
                    }
                }
                EntryState::Committed => max_index = max_index.max(handle.index),
            }
        }

        info!(max_index, discarded, "FileQueue opened");

        Ok(Self {
            state: RwLock::new(QueueState {
                directory,
                max_index,
            }),
            pool,
        })
    }

    /// Write a payload that stays invisible to readers until [`FileQueue::commit`].
    pub fn add_uncommitted(&self, payload: &[u8]) -> Result<Handle> {
        let mut state = self.state.write();
        state.max_index += 1;
        let handle = Handle::uncommitted(state.max_index);
        self.write_entry(&state.directory, handle, payload)?;
        debug!(%handle, size = payload.len(), "Entry written");
        Ok(handle)
    }

    /// Write a payload directly as committed.
    ///
    /// The bytes land under the uncommitted name first and are renamed, so a
    /// crash during the write never exposes a partial committed file.
    pub fn add_committed(&self, payload: &[u8]) -> Result<Handle> {
        let mut state = self.state.write();
        state.max_index += 1;
        let staged = Handle::uncommitted(state.max_index);
        self.write_entry(&state.directory, staged, payload)?;
        let handle = promote(&state.directory, staged)?;
        debug!(%handle, size = payload.len(), "Entry written");
        Ok(handle)
    }

    /// Rename each handle to its committed name, in order.
    ///
    /// Stops at the first failure; entries renamed before it stay committed.
    pub fn commit(&self, handles: &[Handle]) -> Result<Vec<Handle>> {
        let state = self.state.write();
        let mut committed = Vec::with_capacity(handles.len());
        for &handle in handles {
            committed.push(promote(&state.directory, handle)?);
        }
        debug!(count = committed.len(), "Entries committed");
        Ok(committed)
    }

    /// Read the committed entry with the lowest index.
    ///
    /// The entry stays on disk until [`FileQueue::delete`] is called with its handle.
    pub fn next(&self) -> Result<Option<QueueEntry>> {
        let state = self.state.write();

        let committed = match committed_indices(&state.directory) {
            Ok(indices) => indices,
            Err(err) => {
                warn!(%err, "Failed to list queue directory, treating as empty");
                return Ok(None);
            }
        };

        let Some(&index) = committed.first() else {
            return Ok(None);
        };

        let handle = Handle::committed(index);
        let compressed = fs::read(state.directory.join(handle.file_name()))?;
        let payload = snap::raw::Decoder::new().decompress_vec(&compressed)?;

        Ok(Some(QueueEntry {
            payload,
            handle,
            has_more: committed.len() > 1,
        }))
    }

    /// Remove an entry. Deleting an entry that is already gone succeeds.
    pub fn delete(&self, handle: &Handle) -> Result<()> {
        let state = self.state.write();
        match fs::remove_file(state.directory.join(handle.file_name())) {
            Ok(()) => {
                debug!(%handle, "Entry deleted");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Number of committed entries currently on disk
    pub fn len(&self) -> Result<usize> {
        let state = self.state.read();
        Ok(committed_indices(&state.directory)?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Highest index allocated so far
    pub fn current_index(&self) -> u64 {
        self.state.read().max_index
    }

    pub fn directory(&self) -> PathBuf {
        self.state.read().directory.clone()
    }

    fn write_entry(&self, directory: &Path, handle: Handle, payload: &[u8]) -> Result<()> {
        let mut buf = self.pool.checkout(snap::raw::max_compress_len(payload.len()));
        let n = snap::raw::Encoder::new().compress(payload, &mut buf)?;

        let mut file = File::create(directory.join(handle.file_name()))?;
        file.write_all(&buf[..n])?;
        file.sync_all()?;
        Ok(())
    }
}

fn promote(directory: &Path, handle: Handle) -> Result<Handle> {
    if handle.is_committed() {
        return Ok(handle);
    }
    let committed = Handle::committed(handle.index);
    fs::rename(
        directory.join(handle.file_name()),
        directory.join(committed.file_name()),
    )?;
    Ok(committed)
}

fn list_handles(directory: &Path) -> Result<Vec<Handle>> {
    let mut handles = Vec::new();
    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        if let Some(handle) = entry.file_name().to_str().and_then(|n| n.parse().ok()) {
            handles.push(handle);
        }
    }
    Ok(handles)
}

fn committed_indices(directory: &Path) -> Result<Vec<u64>> {
    let mut indices: Vec<u64> = list_handles(directory)?
        .into_iter()
        .filter(Handle::is_committed)
        .map(|h| h.index)
        .collect();
    indices.sort_unstable();
    Ok(indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_handle_display_and_parse() {
        let handle = Handle::uncommitted(12);
        assert_eq!(handle.to_string(), "12.uncommitted");
        assert_eq!("12.uncommitted".parse::<Handle>().unwrap(), handle);
        assert_eq!("3.committed".parse::<Handle>().unwrap(), Handle::committed(3));
    }

    #[test]
    fn test_handle_parse_rejects_garbage() {
        assert!("abc.committed".parse::<Handle>().is_err());
        assert!("12.tmp".parse::<Handle>().is_err());
        assert!("12".parse::<Handle>().is_err());
    }

    #[test]
    fn test_open_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("nested").join("queue");
        let queue = FileQueue::open(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(queue.current_index(), 0);
    }

    #[test]
    fn test_file_content_is_snappy_block() {
        let temp_dir = TempDir::new().unwrap();
        let queue = FileQueue::open(temp_dir.path()).unwrap();

        let handle = queue.add_committed(b"hello hello hello hello").unwrap();
        let raw = fs::read(temp_dir.path().join(handle.file_name())).unwrap();
        let decoded = snap::raw::Decoder::new().decompress_vec(&raw).unwrap();
        assert_eq!(decoded, b"hello hello hello hello");
    }

    #[test]
    fn test_uncommitted_is_invisible() {
        let temp_dir = TempDir::new().unwrap();
        let queue = FileQueue::open(temp_dir.path()).unwrap();

        queue.add_uncommitted(b"pending").unwrap();
        assert!(queue.next().unwrap().is_none());
        assert!(queue.is_empty().unwrap());
    }

    #[test]
    fn test_commit_twice_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let queue = FileQueue::open(temp_dir.path()).unwrap();

        let handle = queue.add_uncommitted(b"a").unwrap();
        let committed = queue.commit(&[handle]).unwrap();
        assert_eq!(committed, vec![Handle::committed(handle.index)]);

        let again = queue.commit(&committed).unwrap();
        assert_eq!(again, committed);
        assert_eq!(queue.len().unwrap(), 1);
    }

    #[test]
    fn test_commit_missing_handle_errors() {
        let temp_dir = TempDir::new().unwrap();
        let queue = FileQueue::open(temp_dir.path()).unwrap();

        let result = queue.commit(&[Handle::uncommitted(77)]);
        assert!(matches!(result, Err(QueueError::Io(_))));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let queue = FileQueue::open(temp_dir.path()).unwrap();

        let handle = queue.add_committed(b"x").unwrap();
        queue.delete(&handle).unwrap();
        queue.delete(&handle).unwrap();
        assert!(queue.next().unwrap().is_none());
    }

    #[test]
    fn test_has_more() {
        let temp_dir = TempDir::new().unwrap();
        let queue = FileQueue::open(temp_dir.path()).unwrap();

        queue.add_committed(b"one").unwrap();
        queue.add_committed(b"two").unwrap();

        let first = queue.next().unwrap().unwrap();
        assert!(first.has_more);
        queue.delete(&first.handle).unwrap();

        let second = queue.next().unwrap().unwrap();
        assert!(!second.has_more);
        assert_eq!(second.payload, b"two");
    }

    #[test]
    fn test_corrupt_entry_surfaces_error() {
        let temp_dir = TempDir::new().unwrap();
        let queue = FileQueue::open(temp_dir.path()).unwrap();

        fs::write(temp_dir.path().join("1.committed"), [0xff, 0xff, 0xff, 0xff]).unwrap();
        assert!(matches!(queue.next(), Err(QueueError::Snappy(_))));
    }

    #[test]
    fn test_foreign_files_are_ignored() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("notes.txt"), b"hi").unwrap();
        fs::write(temp_dir.path().join("x.committed"), b"hi").unwrap();

        let queue = FileQueue::open(temp_dir.path()).unwrap();
        assert_eq!(queue.current_index(), 0);
        assert!(queue.next().unwrap().is_none());
        assert!(temp_dir.path().join("notes.txt").exists());
    }

    #[test]
    fn test_large_payload_bypasses_pool() {
        static SMALL: std::sync::OnceLock<BufferPool> = std::sync::OnceLock::new();
        let pool = SMALL.get_or_init(|| BufferPool::new(64));

        let temp_dir = TempDir::new().unwrap();
        let queue = FileQueue::open_with_pool(temp_dir.path(), pool).unwrap();

        let payload: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        queue.add_committed(&payload).unwrap();
        assert_eq!(queue.next().unwrap().unwrap().payload, payload);
    }
}
