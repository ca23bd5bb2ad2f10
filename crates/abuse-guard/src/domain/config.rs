//! Guard configuration with validation.
//!
//! All tunables of the engine live here and are passed in at construction
//! time. Durations use humantime notation in TOML (`"15m"`, `"24h"`).

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

/// Default failures tolerated inside one window before a block
pub const DEFAULT_MAX_FAILED_ATTEMPTS: u32 = 10;
/// Default counting window
pub const DEFAULT_FAILURE_WINDOW: Duration = Duration::from_secs(15 * 60);
/// Default first block
pub const DEFAULT_INITIAL_BLOCK_DURATION: Duration = Duration::from_secs(15 * 60);
/// Default ceiling for escalated blocks
pub const DEFAULT_MAX_BLOCK_DURATION: Duration = Duration::from_secs(24 * 60 * 60);
/// Default reaper period
pub const DEFAULT_REAPER_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Main guard configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GuardConfig {
    /// Enable tracking and blocking; when false every request is allowed
    pub enabled: bool,
    /// Failures inside one window that trigger a block
    pub max_failed_attempts: u32,
    /// Length of the counting window
    #[serde(with = "humantime_serde")]
    pub failure_window: Duration,
    /// First block duration, doubled for each escalation step
    #[serde(with = "humantime_serde")]
    pub initial_block_duration: Duration,
    /// Ceiling for any single block
    #[serde(with = "humantime_serde")]
    pub max_block_duration: Duration,
    /// Keys (as displayed, e.g. `127.0.0.1` or `user:ops`) that are never tracked
    pub allowlist: Vec<String>,
    /// HTTP statuses in the 4xx class that do not count as failures
    pub exempt_statuses: Vec<u16>,
    /// Reaper configuration
    pub reaper: ReaperConfig,
    /// Client identity resolution
    pub resolver: ResolverConfig,
    /// Upper bound on records held by the in-memory store (None = unbounded)
    pub max_tracked_clients: Option<usize>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_failed_attempts: DEFAULT_MAX_FAILED_ATTEMPTS,
            failure_window: DEFAULT_FAILURE_WINDOW,
            initial_block_duration: DEFAULT_INITIAL_BLOCK_DURATION,
            max_block_duration: DEFAULT_MAX_BLOCK_DURATION,
            allowlist: Vec::new(),
            exempt_statuses: Vec::new(),
            reaper: ReaperConfig::default(),
            resolver: ResolverConfig::default(),
            max_tracked_clients: None,
        }
    }
}

impl GuardConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_failed_attempts == 0 {
            return Err(ConfigError::InvalidThreshold(
                "max_failed_attempts cannot be 0".into(),
            ));
        }

        if self.failure_window.is_zero() {
            return Err(ConfigError::InvalidDuration(
                "failure_window cannot be 0".into(),
            ));
        }

        if self.initial_block_duration.is_zero() {
            return Err(ConfigError::InvalidDuration(
                "initial_block_duration cannot be 0".into(),
            ));
        }

        if self.max_block_duration < self.initial_block_duration {
            return Err(ConfigError::InvalidDuration(format!(
                "max_block_duration ({:?}) is shorter than initial_block_duration ({:?})",
                self.max_block_duration, self.initial_block_duration
            )));
        }

        if self.reaper.interval.is_zero() {
            return Err(ConfigError::InvalidDuration(
                "reaper.interval cannot be 0".into(),
            ));
        }

        if self.reaper.batch_size == 0 {
            return Err(ConfigError::InvalidLimit(
                "reaper.batch_size cannot be 0".into(),
            ));
        }

        if self.max_tracked_clients == Some(0) {
            return Err(ConfigError::InvalidLimit(
                "max_tracked_clients cannot be 0".into(),
            ));
        }

        if let Some(status) = self
            .exempt_statuses
            .iter()
            .find(|s| !(400..500).contains(*s))
        {
            return Err(ConfigError::InvalidLimit(format!(
                "exempt status {status} is not a 4xx status"
            )));
        }

        if self.resolver.header.trim().is_empty() {
            return Err(ConfigError::InvalidResolver(
                "forwarded header name cannot be empty".into(),
            ));
        }

        Ok(())
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Small thresholds and short windows for tests.
    pub fn for_testing() -> Self {
        Self {
            max_failed_attempts: 3,
            failure_window: Duration::from_secs(60),
            initial_block_duration: Duration::from_secs(60),
            max_block_duration: Duration::from_secs(8 * 60),
            ..Self::default()
        }
    }

    /// Whether a displayed key is exempt from tracking.
    pub fn is_allowlisted(&self, key: &str) -> bool {
        self.allowlist.iter().any(|k| k == key)
    }
}

/// Reaper configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReaperConfig {
    /// Period between sweeps
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    /// Keys examined between cooperative yields
    pub batch_size: usize,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_REAPER_INTERVAL,
            batch_size: 1024,
        }
    }
}

/// How the client key is derived for a request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum KeyScope {
    /// Always track by address
    #[default]
    Ip,
    /// Track by `user:<id>` when the request carries an authenticated user
    PreferUser,
}

/// Client identity resolution configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResolverConfig {
    /// Header carrying the proxy chain
    pub header: String,
    /// Peers allowed to set the forwarded header (empty = trust any peer)
    pub trusted_proxies: Vec<IpAddr>,
    /// Key scope
    pub scope: KeyScope,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            header: "x-forwarded-for".to_string(),
            trusted_proxies: Vec::new(),
            scope: KeyScope::Ip,
        }
    }
}

/// Configuration errors, raised at startup only
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid threshold: {0}")]
    InvalidThreshold(String),

    #[error("invalid duration: {0}")]
    InvalidDuration(String),

    #[error("invalid limit: {0}")]
    InvalidLimit(String),

    #[error("invalid resolver settings: {0}")]
    InvalidResolver(String),

    #[error("failed to parse configuration: {0}")]
    Parse(String),

    #[error("failed to read configuration file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
