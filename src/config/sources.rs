use super::models::Config;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "SIGNALSPOOL_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/signalspool.toml";
const ENV_PREFIX: &str = "SIGNALSPOOL";
const ENV_SEPARATOR: &str = "__";

/// Path of the configuration file: `SIGNALSPOOL_CONFIG` or the default location
pub fn default_path() -> PathBuf {
    env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Load configuration from multiple sources with priority:
/// 1. Defaults (embedded in structs)
/// 2. TOML file (if exists)
/// 3. Environment variables from .env file (via dotenvy)
/// 4. System environment variables (highest priority)
pub fn load() -> Result<Config, ConfigError> {
    // Load .env file if it exists (ignore errors if file doesn't exist)
    let _ = dotenvy::dotenv();

    load_from_sources(default_path())
}

/// Load configuration from a specific path and environment
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::warn!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // SIGNALSPOOL__STORAGE__TTL_SECS -> storage.ttl_secs
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    let config = builder.build()?;
    config.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_defaults_only() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.storage.ttl_secs, 7200);
        assert_eq!(config.server.bind_addr.to_string(), "127.0.0.1:9095");
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[storage]
directory = "/var/lib/agent/wal"
ttl_secs = 3600

[queue]
directory = "/var/lib/agent/queue"
buffer_size = "4MB"

[eviction]
interval_secs = 30

[server]
bind_addr = "0.0.0.0:9100"
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.storage.directory, PathBuf::from("/var/lib/agent/wal"));
        assert_eq!(config.storage.ttl_secs, 3600);
        assert_eq!(config.queue.buffer_size.as_u64(), 4 * 1024 * 1024);
        assert_eq!(config.eviction.interval_secs, 30);
        assert_eq!(config.server.bind_addr.to_string(), "0.0.0.0:9100");
    }

    #[test]
    fn test_numeric_buffer_size() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");
        fs::write(&config_path, "[queue]\nbuffer_size = 131072\n").unwrap();

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.queue.buffer_size.as_u64(), 131072);
    }
}
