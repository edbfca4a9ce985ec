pub mod file_queue;
pub mod pool;

pub use file_queue::{EntryState, FileQueue, Handle, QueueEntry, QueueError};
pub use pool::{BufferPool, PooledBuffer};
