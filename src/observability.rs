//! In-process counters for the store coordinator (latencies, current key)

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Running count and total of one latency series
#[derive(Debug, Default)]
struct Timer {
    count: AtomicU64,
    total_micros: AtomicU64,
    last_micros: AtomicU64,
}

impl Timer {
    fn observe(&self, elapsed: Duration) {
        let micros = elapsed.as_micros() as u64;
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total_micros.fetch_add(micros, Ordering::Relaxed);
        self.last_micros.store(micros, Ordering::Relaxed);
    }

    fn snapshot(&self) -> TimerSnapshot {
        let count = self.count.load(Ordering::Relaxed);
        let total = self.total_micros.load(Ordering::Relaxed);
        TimerSnapshot {
            count,
            last_micros: self.last_micros.load(Ordering::Relaxed),
            mean_micros: if count == 0 { 0 } else { total / count },
        }
    }
}

/// Metrics handle for store operations
#[derive(Debug, Default)]
pub struct StoreMetrics {
    write_time: Timer,
    read_time: Timer,
    eviction_time: Timer,
    current_key: AtomicU64,
    evicted_total: AtomicU64,
}

impl StoreMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe_write(&self, elapsed: Duration, key: u64) {
        self.write_time.observe(elapsed);
        self.current_key.store(key, Ordering::Relaxed);
    }

    pub fn observe_read(&self, elapsed: Duration) {
        self.read_time.observe(elapsed);
    }

    pub fn observe_eviction(&self, elapsed: Duration, evicted: usize) {
        self.eviction_time.observe(elapsed);
        self.evicted_total
            .fetch_add(evicted as u64, Ordering::Relaxed);
        tracing::debug!(evicted, micros = elapsed.as_micros() as u64, "Eviction recorded");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            writes: self.write_time.snapshot(),
            reads: self.read_time.snapshot(),
            evictions: self.eviction_time.snapshot(),
            current_key: self.current_key.load(Ordering::Relaxed),
            evicted_total: self.evicted_total.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimerSnapshot {
    pub count: u64,
    pub last_micros: u64,
    pub mean_micros: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub writes: TimerSnapshot,
    pub reads: TimerSnapshot,
    pub evictions: TimerSnapshot,
    pub current_key: u64,
    pub evicted_total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_updates_current_key() {
        let metrics = StoreMetrics::new();
        metrics.observe_write(Duration::from_micros(10), 5);
        metrics.observe_write(Duration::from_micros(30), 6);

        let snap = metrics.snapshot();
        assert_eq!(snap.current_key, 6);
        assert_eq!(snap.writes.count, 2);
        assert_eq!(snap.writes.mean_micros, 20);
        assert_eq!(snap.writes.last_micros, 30);
    }

    #[test]
    fn test_empty_snapshot() {
        let snap = StoreMetrics::new().snapshot();
        assert_eq!(snap.reads.count, 0);
        assert_eq!(snap.reads.mean_micros, 0);
        assert_eq!(snap.evicted_total, 0);
    }

    #[test]
    fn test_eviction_accumulates() {
        let metrics = StoreMetrics::new();
        metrics.observe_eviction(Duration::from_millis(1), 3);
        metrics.observe_eviction(Duration::from_millis(1), 4);
        assert_eq!(metrics.snapshot().evicted_total, 7);
        assert_eq!(metrics.snapshot().evictions.count, 2);
    }
}
