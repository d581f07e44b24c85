//! The resolved, typed configuration the rest of the service is built
//! against — the output of [`crate::loader::ConfigLoader::load`].

use std::path::PathBuf;
use std::time::Duration;

use crate::secret::SecretString;

/// Dashboard HTTP server bind settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// IMAP connection settings shared by every configured mailbox.
#[derive(Debug, Clone)]
pub struct ImapSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: SecretString,
    pub use_tls: bool,
}

/// Baseline words/day capacity (`C_default`) and the allow-backfill flag.
#[derive(Debug, Clone, Copy)]
pub struct CapacityConfig {
    pub default_words_per_day: f64,
}

impl Default for CapacityConfig {
    fn default() -> Self {
        Self {
            default_words_per_day: 5000.0,
        }
    }
}

/// Mirrors `intake_core::listener::BackoffConfig` field-for-field so
/// `intake-config` needn't depend on `intake-core`; `intake-server` converts
/// at the wiring boundary.
#[derive(Debug, Clone, Copy)]
pub struct BackoffSettings {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub max_retries: u32,
    pub max_retry_delay: Duration,
}

impl Default for BackoffSettings {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(3),
            max_delay: Duration::from_secs(5 * 60),
            max_retries: 5,
            max_retry_delay: Duration::from_secs(30 * 60),
        }
    }
}

/// Mirrors `intake_core::listener::HealthMonitorConfig`.
#[derive(Debug, Clone, Copy)]
pub struct HealthSettings {
    pub reconnect_threshold: u32,
    pub reconnect_window: Duration,
    pub consecutive_failure_threshold: u32,
    pub health_check_interval: Duration,
    pub health_check_timeout: Duration,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            reconnect_threshold: 10,
            reconnect_window: Duration::from_secs(5 * 60),
            consecutive_failure_threshold: 3,
            health_check_interval: Duration::from_secs(3 * 60),
            health_check_timeout: Duration::from_secs(15),
        }
    }
}

/// Provenance of the resolved configuration, surfaced through `/health` for
/// operator diagnostics.
#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
    pub config_file_present: bool,
}

/// The fully resolved configuration for one process.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub imap: ImapSettings,
    pub mailboxes: Vec<String>,
    pub capacity: CapacityConfig,
    pub backoff: BackoffSettings,
    pub health: HealthSettings,
    pub allow_backfill: bool,
    pub data_dir: PathBuf,
    pub metadata: ConfigMetadata,
}
