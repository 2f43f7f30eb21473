//! Configuration file and logging setup.
//!
//! ```toml
//! [logging]
//! level = "info"
//! log_file = ""
//!
//! [rewards]
//! min_withdrawal = 0
//! skip_zero_transfers = true
//! ```

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV_VAR: &str = "STAKEPOOL_CONFIG";

/// Complete configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardsConfig {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Controller behaviour.
    #[serde(default)]
    pub rewards: RewardsSettings,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace" | "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log file path. Empty = stderr.
    #[serde(default)]
    pub log_file: String,
}

/// Controller settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardsSettings {
    /// Smallest non-zero amount a withdrawal may request.
    #[serde(default)]
    pub min_withdrawal: u64,
    /// Zero-amount withdrawals succeed without calling the transfer.
    #[serde(default = "default_true")]
    pub skip_zero_transfers: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_file: String::new(),
        }
    }
}

impl Default for RewardsSettings {
    fn default() -> Self {
        Self {
            min_withdrawal: 0,
            skip_zero_transfers: true,
        }
    }
}

impl RewardsConfig {
    /// Load the file named by `$STAKEPOOL_CONFIG`.
    ///
    /// Falls back to defaults if the variable is unset.
    pub fn load() -> anyhow::Result<Self> {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) => Self::load_from(PathBuf::from(path)),
            Err(_) => Ok(Self::default()),
        }
    }

    /// Load configuration from `path`.
    pub fn load_from(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: RewardsConfig = toml::from_str(content)?;
        Ok(config)
    }
}

/// Install a global `tracing` subscriber for `config`.
///
/// `RUST_LOG` directives take precedence over the configured level. Fails
/// if a global subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("stakepool={}", config.level)))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.log_file.is_empty() {
        builder
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| anyhow::anyhow!(e))?;
    } else {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.log_file)?;
        builder
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init()
            .map_err(|e| anyhow::anyhow!(e))?;
    }
    Ok(())
}
