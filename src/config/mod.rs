use crate::utils::error::{PoolError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub bench: BenchConfig,
}

/// Sizing and timing of one pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Remote endpoint, e.g. "127.0.0.1:2020"
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Idle connections never evicted, whatever their age
    #[serde(default = "default_init_size")]
    pub init_size: usize,
    /// Idle count above which the shorter peak timeout applies
    #[serde(default = "default_idle_size")]
    pub idle_size: usize,
    /// Hard ceiling on connections issued at once
    #[serde(default = "default_peak_size")]
    pub peak_size: usize,
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_peak_timeout_secs")]
    pub peak_timeout_secs: u64,
    /// Deadline for `Pool::get` dials (milliseconds)
    #[serde(default = "default_dial_timeout_ms")]
    pub dial_timeout_ms: u64,
    #[serde(default = "default_nodelay")]
    pub nodelay: bool,
    #[serde(default)]
    pub keepalive_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String, // "json" or "pretty"
}

/// Load driver settings for the `bench` subcommand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchConfig {
    #[serde(default = "default_requests")]
    pub requests: u64,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Log gauges every `tick` finished requests (0 disables)
    #[serde(default = "default_tick")]
    pub tick: u64,
    /// Per-request deadline covering get and call (milliseconds)
    #[serde(default = "default_request_timeout_ms")]
    pub timeout_ms: u64,
}

// Default values
fn default_endpoint() -> String {
    "127.0.0.1:2020".to_string()
}

fn default_init_size() -> usize {
    1
}

fn default_idle_size() -> usize {
    10
}

fn default_peak_size() -> usize {
    100
}

fn default_idle_timeout_secs() -> u64 {
    10
}

fn default_peak_timeout_secs() -> u64 {
    2
}

fn default_dial_timeout_ms() -> u64 {
    1000
}

fn default_nodelay() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_requests() -> u64 {
    1
}

fn default_concurrency() -> usize {
    1
}

fn default_tick() -> u64 {
    10000
}

fn default_request_timeout_ms() -> u64 {
    1000
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            init_size: default_init_size(),
            idle_size: default_idle_size(),
            peak_size: default_peak_size(),
            idle_timeout_secs: default_idle_timeout_secs(),
            peak_timeout_secs: default_peak_timeout_secs(),
            dial_timeout_ms: default_dial_timeout_ms(),
            nodelay: default_nodelay(),
            keepalive_secs: None,
        }
    }
}

impl PoolConfig {
    pub fn new(
        endpoint: impl Into<String>,
        init_size: usize,
        idle_size: usize,
        peak_size: usize,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            init_size,
            idle_size,
            peak_size,
            ..Default::default()
        }
    }

    /// Raise tiers so that `1 <= init <= idle <= peak` and timeouts are at
    /// least one second. Violations are corrected upward, never rejected.
    pub fn clamped(mut self) -> Self {
        self.init_size = self.init_size.max(1);
        self.idle_size = self.idle_size.max(self.init_size);
        self.peak_size = self.peak_size.max(self.idle_size);
        self.idle_timeout_secs = self.idle_timeout_secs.max(1);
        self.peak_timeout_secs = self.peak_timeout_secs.max(1);
        self
    }

    pub fn dial_timeout(&self) -> Duration {
        Duration::from_millis(self.dial_timeout_ms)
    }

    pub fn keepalive(&self) -> Option<Duration> {
        self.keepalive_secs.map(Duration::from_secs)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            requests: default_requests(),
            concurrency: default_concurrency(),
            tick: default_tick(),
            timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl BenchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| PoolError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| PoolError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.pool.endpoint.trim().is_empty() {
            return Err(PoolError::Config(
                "pool.endpoint cannot be empty".to_string(),
            ));
        }

        if self.pool.dial_timeout_ms == 0 {
            return Err(PoolError::Config(
                "pool.dial_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(PoolError::Config(format!(
                "Invalid log format: {}. Must be 'pretty' or 'json'",
                self.logging.format
            )));
        }

        if self.bench.concurrency == 0 {
            return Err(PoolError::Config(
                "bench.concurrency must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Create example configuration file
    pub fn create_example<P: AsRef<Path>>(path: P) -> Result<()> {
        let example = r#"[pool]
endpoint = "127.0.0.1:2020"
init_size = 1     # idle connections kept warm forever
idle_size = 10    # above this, idle connections expire after peak_timeout_secs
peak_size = 100   # hard ceiling on connections handed out at once
idle_timeout_secs = 10
peak_timeout_secs = 2
dial_timeout_ms = 1000
nodelay = true
# keepalive_secs = 60

[logging]
level = "info"  # Options: "trace", "debug", "info", "warn", "error"
format = "pretty"  # Options: "pretty", "json"

[bench]
requests = 10000
concurrency = 16
tick = 1000
timeout_ms = 1000
"#;

        std::fs::write(path.as_ref(), example).map_err(|e| {
            PoolError::Config(format!("Failed to write example config: {}", e))
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.pool.endpoint, "127.0.0.1:2020");
        assert_eq!(config.pool.init_size, 1);
        assert_eq!(config.pool.idle_size, 10);
        assert_eq!(config.pool.peak_size, 100);
        assert_eq!(config.pool.idle_timeout_secs, 10);
        assert_eq!(config.pool.peak_timeout_secs, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.pool.endpoint = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.pool.dial_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.bench.concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn tiers_are_clamped_upward() {
        let config = PoolConfig::new("x:1", 0, 0, 0).clamped();
        assert_eq!(config.init_size, 1);
        assert_eq!(config.idle_size, 1);
        assert_eq!(config.peak_size, 1);

        let config = PoolConfig::new("x:1", 5, 2, 3).clamped();
        assert_eq!(config.init_size, 5);
        assert_eq!(config.idle_size, 5);
        assert_eq!(config.peak_size, 5);
    }

    #[test]
    fn example_round_trips_through_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rpcpool.toml");
        Config::create_example(&path).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.bench.concurrency, 16);
        assert_eq!(config.pool.peak_size, 100);
        assert_eq!(config.pool.keepalive(), None);
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let config: Config = toml::from_str("[pool]\nendpoint = \"10.0.0.1:9000\"\n").unwrap();
        assert_eq!(config.pool.endpoint, "10.0.0.1:9000");
        assert_eq!(config.pool.dial_timeout(), Duration::from_millis(1000));
        assert_eq!(config.logging.level, "info");
    }
}
