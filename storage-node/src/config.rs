//! Configuration for the storage node.
//!
//! Loads configuration from a TOML file, then applies `STORAGE_NODE_*`
//! environment overrides (a `.env` file is read first when present).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub node: NodeConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// HTTP listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Node directory; shares live under `<base_dir>/shares`
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Bytes kept free for other users of the disk
    #[serde(default)]
    pub reserved_space: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Delay before the first cycle after startup
    #[serde(default = "default_slow_start_secs")]
    pub slow_start_secs: u64,

    /// Pause between prefix directories within a cycle
    #[serde(default = "default_prefix_pause_ms")]
    pub prefix_pause_ms: u64,

    /// A new cycle never starts sooner than this after the previous one started
    #[serde(default = "default_minimum_cycle_time_secs")]
    pub minimum_cycle_time_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_port() -> u16 {
    3456
}

fn default_base_dir() -> PathBuf {
    PathBuf::from("/var/lib/storage-node")
}

fn default_slow_start_secs() -> u64 {
    300
}

fn default_prefix_pause_ms() -> u64 {
    100
}

fn default_minimum_cycle_time_secs() -> u64 {
    3600
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            base_dir: default_base_dir(),
        }
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            slow_start_secs: default_slow_start_secs(),
            prefix_pause_ms: default_prefix_pause_ms(),
            minimum_cycle_time_secs: default_minimum_cycle_time_secs(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl CrawlerConfig {
    pub fn slow_start(&self) -> Duration {
        Duration::from_secs(self.slow_start_secs)
    }

    pub fn prefix_pause(&self) -> Duration {
        Duration::from_millis(self.prefix_pause_ms)
    }

    pub fn minimum_cycle_time(&self) -> Duration {
        Duration::from_secs(self.minimum_cycle_time_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply overrides from `.env` and the process environment
    pub fn apply_env(&mut self) -> anyhow::Result<()> {
        let _ = dotenvy::dotenv();
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        if let Some(port) = var("STORAGE_NODE_PORT") {
            self.node.port = port.parse()?;
        }
        if let Some(dir) = var("STORAGE_NODE_BASE_DIR") {
            self.node.base_dir = PathBuf::from(dir);
        }
        if let Some(reserved) = var("STORAGE_NODE_RESERVED_SPACE") {
            self.storage.reserved_space = reserved.parse()?;
        }
        if let Some(level) = var("STORAGE_NODE_LOG_LEVEL") {
            self.log.level = level;
        }
        Ok(())
    }

    pub fn shares_dir(&self) -> PathBuf {
        self.node.base_dir.join("shares")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.node.port, 3456);
        assert_eq!(config.storage.reserved_space, 0);
        assert_eq!(config.crawler.minimum_cycle_time(), Duration::from_secs(3600));
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_partial_toml() {
        let config = Config::from_toml(
            r#"
            [node]
            base_dir = "/srv/node"

            [storage]
            reserved_space = 1000000

            [crawler]
            prefix_pause_ms = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.node.port, 3456);
        assert_eq!(config.shares_dir(), PathBuf::from("/srv/node/shares"));
        assert_eq!(config.storage.reserved_space, 1_000_000);
        assert_eq!(config.crawler.prefix_pause(), Duration::ZERO);
        assert_eq!(config.crawler.slow_start_secs, 300);
    }

    #[test]
    fn test_example_config_parses() {
        let config = Config::from_toml(include_str!("../storage-node.example.toml")).unwrap();
        assert_eq!(config.storage.reserved_space, 1_000_000_000);
        assert_eq!(config.crawler.prefix_pause(), Duration::from_millis(100));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("STORAGE_NODE_PORT", "8080"),
            ("STORAGE_NODE_RESERVED_SPACE", "42"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.node.port, 8080);
        assert_eq!(config.storage.reserved_space, 42);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_bad_env_override() {
        let mut config = Config::default();
        let result = config.apply_overrides(|key| {
            (key == "STORAGE_NODE_PORT").then(|| "not-a-port".to_string())
        });
        assert!(result.is_err());
    }
}
