use super::models::Config;
use crate::humanize::ByteSize;
use thiserror::Error;

const MIN_BUFFER_SIZE: ByteSize = ByteSize::kib(64);
const MAX_BUFFER_SIZE: ByteSize = ByteSize::mib(1024);

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Retention TTL must be positive: {field} = {value}")]
    InvalidRetentionTtl { field: String, value: u64 },

    #[error("Eviction interval must be positive")]
    InvalidEvictionInterval,

    #[error("Queue buffer size {actual} outside allowed range [{min}, {max}]")]
    BufferSizeOutOfRange {
        actual: ByteSize,
        min: ByteSize,
        max: ByteSize,
    },

    #[error("Queue and store must use different directories: {0}")]
    SharedDirectory(String),
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_retention(config)?;
    validate_queue(config)?;
    validate_directories(config)?;
    Ok(())
}

fn validate_retention(config: &Config) -> Result<(), ValidationError> {
    if config.storage.ttl_secs == 0 {
        return Err(ValidationError::InvalidRetentionTtl {
            field: "storage.ttl_secs".to_string(),
            value: config.storage.ttl_secs,
        });
    }
    if config.eviction.interval_secs == 0 {
        return Err(ValidationError::InvalidEvictionInterval);
    }
    Ok(())
}

fn validate_queue(config: &Config) -> Result<(), ValidationError> {
    let size = config.queue.buffer_size;
    if size < MIN_BUFFER_SIZE || size > MAX_BUFFER_SIZE {
        return Err(ValidationError::BufferSizeOutOfRange {
            actual: size,
            min: MIN_BUFFER_SIZE,
            max: MAX_BUFFER_SIZE,
        });
    }
    Ok(())
}

/// Queue files and store files must live in separate trees.
fn validate_directories(config: &Config) -> Result<(), ValidationError> {
    let queue = &config.queue.directory;
    let store = &config.storage.directory;
    if queue == store || queue.starts_with(store) || store.starts_with(queue) {
        return Err(ValidationError::SharedDirectory(queue.display().to_string()));
    }
    Ok(())
}
