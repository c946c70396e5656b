//! Main configuration module for Ember Core
//!
//! This module implements the single-config philosophy where all node
//! settings are defined in one `embercore.toml` file.

use crate::error::{ConfigError, ConfigResult};
use embercore_mempool::PoolLimits;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Main configuration struct containing all Ember Core settings.
///
/// Loaded from a single `embercore.toml` file. Every section falls back
/// to its defaults when absent, so a minimal deployment ships an empty
/// file and overrides only what it needs.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Node-wide settings
    #[serde(default)]
    pub node: NodeConfig,

    /// Transaction pool limits
    #[serde(default)]
    pub mempool: MempoolConfig,

    /// Orphan pool limits
    #[serde(default)]
    pub orphans: OrphanConfig,

    /// Pool persistence switch
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the TOML configuration file
    ///
    /// # Returns
    ///
    /// The parsed and validated configuration, or an error if loading fails.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        info!("Loading configuration from {:?}", path);

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content)?;

        debug!("Configuration parsed successfully, validating...");
        config.validate()?;

        info!(
            "Configuration loaded: data_dir={}, persistence={}",
            config.node.data_dir, config.persistence.enabled
        );

        Ok(config)
    }

    /// Load configuration from a TOML string.
    ///
    /// Useful for testing or when configuration is provided as a string.
    pub fn from_str(content: &str) -> ConfigResult<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Checks that all values are within acceptable ranges and that
    /// the configuration is internally consistent.
    pub fn validate(&self) -> ConfigResult<()> {
        self.node.validate()?;
        self.mempool.validate()?;
        self.orphans.validate()?;
        self.logging.validate()?;

        debug!("Configuration validation passed");
        Ok(())
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(())
    }

    /// Pool limits assembled from the mempool and orphan sections.
    pub fn pool_limits(&self) -> PoolLimits {
        PoolLimits {
            max_pool_bytes: self.mempool.max_pool_bytes as usize,
            max_tx_size: self.mempool.max_tx_size as usize,
            max_orphan_entries: self.orphans.max_entries as usize,
            orphan_expiry_secs: self.orphans.expiry_secs,
            max_ancestor_depth: self.mempool.max_ancestor_depth,
            min_relay_fee: self.mempool.min_relay_fee,
        }
    }

    /// Directory holding the pool snapshot files.
    pub fn snapshot_dir(&self) -> PathBuf {
        PathBuf::from(&self.node.data_dir)
    }
}

// =============================================================================
// Node Configuration
// =============================================================================

/// Node-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Data directory path
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_data_dir() -> String {
    "./data".to_string()
}

impl NodeConfig {
    /// Validate the node configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.data_dir.is_empty() {
            return Err(ConfigError::MissingField("node.data_dir"));
        }
        Ok(())
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

// =============================================================================
// Mempool Configuration
// =============================================================================

/// Transaction pool limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MempoolConfig {
    /// Byte budget for the whole pool
    #[serde(default = "default_max_pool_bytes")]
    pub max_pool_bytes: u64,

    /// Maximum canonical size of a single transaction in bytes
    #[serde(default = "default_max_tx_size")]
    pub max_tx_size: u64,

    /// Minimum fee for admission, in base units
    #[serde(default)]
    pub min_relay_fee: u64,

    /// Longest tolerated unconfirmed-ancestor chain, the entry included
    #[serde(default = "default_max_ancestor_depth")]
    pub max_ancestor_depth: u32,
}

fn default_max_pool_bytes() -> u64 {
    300_000_000 // 300 MB
}

fn default_max_tx_size() -> u64 {
    1_000_000
}

fn default_max_ancestor_depth() -> u32 {
    50
}

impl MempoolConfig {
    /// Validate the mempool configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_pool_bytes == 0 {
            return Err(ConfigError::ZeroLimit("mempool.max_pool_bytes"));
        }
        if self.max_tx_size == 0 {
            return Err(ConfigError::ZeroLimit("mempool.max_tx_size"));
        }
        if self.max_tx_size > self.max_pool_bytes {
            return Err(ConfigError::TxSizeExceedsPool {
                max_tx_size: self.max_tx_size,
                max_pool_bytes: self.max_pool_bytes,
            });
        }
        if self.max_ancestor_depth == 0 {
            return Err(ConfigError::ZeroLimit("mempool.max_ancestor_depth"));
        }
        Ok(())
    }
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self {
            max_pool_bytes: default_max_pool_bytes(),
            max_tx_size: default_max_tx_size(),
            min_relay_fee: 0,
            max_ancestor_depth: default_max_ancestor_depth(),
        }
    }
}

// =============================================================================
// Orphan Pool Configuration
// =============================================================================

/// Orphan pool limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrphanConfig {
    /// Maximum resident orphans; the oldest is evicted beyond this
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,

    /// Seconds an orphan may wait for its parents
    #[serde(default = "default_expiry_secs")]
    pub expiry_secs: u64,
}

fn default_max_entries() -> u64 {
    100
}

fn default_expiry_secs() -> u64 {
    259_200 // 72 hours
}

impl OrphanConfig {
    /// Validate the orphan pool configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_entries == 0 {
            return Err(ConfigError::ZeroLimit("orphans.max_entries"));
        }
        if self.expiry_secs == 0 {
            return Err(ConfigError::ZeroLimit("orphans.expiry_secs"));
        }
        Ok(())
    }
}

impl Default for OrphanConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            expiry_secs: default_expiry_secs(),
        }
    }
}

// =============================================================================
// Persistence Configuration
// =============================================================================

/// Pool persistence switch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Dump pools at shutdown and restore them at startup
    #[serde(default = "default_persistence_enabled")]
    pub enabled: bool,
}

fn default_persistence_enabled() -> bool {
    true
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: default_persistence_enabled(),
        }
    }
}

// =============================================================================
// Logging Configuration
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (full, compact, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "full".to_string()
}

impl LoggingConfig {
    /// Validate the logging configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.level.clone()));
        }

        let valid_formats = ["full", "compact", "json"];
        if !valid_formats.contains(&self.format.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogFormat(self.format.clone()));
        }

        Ok(())
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
