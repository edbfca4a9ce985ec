use crate::humanize::ByteSize;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub eviction: EvictionConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Sample and bookmark store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Working directory holding `bookmark/` and `sample/`
    #[serde(default = "default_storage_directory")]
    pub directory: PathBuf,
    /// Samples older than this are evicted
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl StorageConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            directory: default_storage_directory(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

fn default_storage_directory() -> PathBuf {
    PathBuf::from("data/store")
}

fn default_ttl_secs() -> u64 {
    2 * 60 * 60
}

/// File queue configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueConfig {
    #[serde(default = "default_queue_directory")]
    pub directory: PathBuf,
    /// Capacity of each pooled compression buffer
    #[serde(default = "default_buffer_size")]
    pub buffer_size: ByteSize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            directory: default_queue_directory(),
            buffer_size: default_buffer_size(),
        }
    }
}

fn default_queue_directory() -> PathBuf {
    PathBuf::from("data/queue")
}

fn default_buffer_size() -> ByteSize {
    ByteSize::mib(16)
}

/// Periodic eviction configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EvictionConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl EvictionConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for EvictionConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

fn default_interval_secs() -> u64 {
    5 * 60
}

/// Status endpoint configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9095))
}
