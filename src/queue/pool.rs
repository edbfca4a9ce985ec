//! Reusable scratch buffers for payload compression.
//!
//! Buffers are kept on per-thread free lists, so checkout and return never
//! contend on a shared lock. A buffer checked out on one thread and dropped on
//! another simply migrates to the second thread's list.

use std::cell::RefCell;
use std::ops::{Deref, DerefMut};
use std::sync::OnceLock;
use thread_local::ThreadLocal;

/// Default capacity of a pooled buffer (16 MiB).
pub const DEFAULT_BUFFER_SIZE: usize = 16 * 1024 * 1024;

/// Free buffers retained per thread before extra ones are dropped.
const MAX_IDLE_PER_THREAD: usize = 4;

static GLOBAL: OnceLock<BufferPool> = OnceLock::new();

pub struct BufferPool {
    buffer_size: usize,
    free: ThreadLocal<RefCell<Vec<Vec<u8>>>>,
}

impl BufferPool {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            buffer_size,
            free: ThreadLocal::new(),
        }
    }

    /// Process-wide pool used by every `FileQueue`.
    pub fn global() -> &'static BufferPool {
        GLOBAL.get_or_init(|| BufferPool::new(DEFAULT_BUFFER_SIZE))
    }

    /// Install the process-wide pool with a custom buffer size.
    ///
    /// Returns false if the global pool was already initialized.
    pub fn init_global(buffer_size: usize) -> bool {
        GLOBAL.set(BufferPool::new(buffer_size)).is_ok()
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Check out a zero-filled buffer of at least `len` bytes.
    ///
    /// Requests larger than the pool's buffer size are served by a one-off
    /// allocation that is released instead of pooled on drop.
    pub fn checkout(&self, len: usize) -> PooledBuffer<'_> {
        if len > self.buffer_size {
            return PooledBuffer {
                buf: vec![0; len],
                pool: None,
            };
        }

        let buf = self
            .free
            .get_or(|| RefCell::new(Vec::new()))
            .borrow_mut()
            .pop()
            .unwrap_or_else(|| vec![0; self.buffer_size]);

        PooledBuffer {
            buf,
            pool: Some(self),
        }
    }

    fn give_back(&self, buf: Vec<u8>) {
        let mut free = self.free.get_or(|| RefCell::new(Vec::new())).borrow_mut();
        if free.len() < MAX_IDLE_PER_THREAD {
            free.push(buf);
        }
    }

    #[cfg(test)]
    fn idle_on_this_thread(&self) -> usize {
        self.free.get().map(|f| f.borrow().len()).unwrap_or(0)
    }
}

/// Exclusive handle to a scratch buffer; returns it to its pool on drop.
pub struct PooledBuffer<'a> {
    buf: Vec<u8>,
    pool: Option<&'a BufferPool>,
}

impl Deref for PooledBuffer<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buf
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        if let Some(pool) = self.pool {
            pool.give_back(std::mem::take(&mut self.buf));
        }
    }
}
