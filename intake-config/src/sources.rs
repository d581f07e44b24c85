//! Raw, unvalidated configuration from the two lower-precedence sources:
//! an optional TOML file and the process environment. [`crate::loader`]
//! layers these with CLI overrides into the typed [`crate::models::Config`].

use std::path::PathBuf;

use serde::Deserialize;

/// Raw configuration as defined in an optional `intake.toml`.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    #[serde(default)]
    pub server: FileServerConfig,
    #[serde(default)]
    pub imap: FileImapConfig,
    pub mailboxes: Option<Vec<String>>,
    #[serde(default)]
    pub capacity: FileCapacityConfig,
    #[serde(default)]
    pub backoff: FileBackoffConfig,
    #[serde(default)]
    pub health: FileHealthConfig,
    pub allow_backfill: Option<bool>,
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct FileServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct FileImapConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub use_tls: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct FileCapacityConfig {
    pub default_words_per_day: Option<f64>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct FileBackoffConfig {
    pub initial_delay_secs: Option<u64>,
    pub max_delay_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub max_retry_delay_secs: Option<u64>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct FileHealthConfig {
    pub reconnect_threshold: Option<u32>,
    pub reconnect_window_secs: Option<u64>,
    pub consecutive_failure_threshold: Option<u32>,
    pub health_check_interval_secs: Option<u64>,
    pub health_check_timeout_secs: Option<u64>,
}

/// Environment-derived configuration values, gathered once at startup.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub mailboxes: Option<Vec<String>>,
    pub mailbox: Option<String>,
    pub email_user: Option<String>,
    pub email_pass: Option<String>,
    pub email_pass_file: Option<PathBuf>,
    pub allow_backfill: Option<bool>,
    pub port: Option<u16>,
    pub c_default: Option<f64>,
    pub imap_host: Option<String>,
    pub imap_port: Option<u16>,
    pub imap_tls: Option<bool>,
    pub data_dir: Option<PathBuf>,
    pub config_path: Option<PathBuf>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self {
            mailboxes: parse_csv_var("MAILBOXES"),
            mailbox: std::env::var("MAILBOX").ok(),
            email_user: std::env::var("EMAIL_USER").ok(),
            email_pass: std::env::var("EMAIL_PASS").ok(),
            email_pass_file: std::env::var("EMAIL_PASS_FILE").ok().map(PathBuf::from),
            allow_backfill: parse_bool_var("ALLOW_BACKFILL"),
            port: std::env::var("PORT").ok().and_then(|s| s.parse().ok()),
            c_default: std::env::var("C_DEFAULT")
                .ok()
                .and_then(|s| s.parse().ok()),
            imap_host: std::env::var("IMAP_HOST").ok(),
            imap_port: std::env::var("IMAP_PORT").ok().and_then(|s| s.parse().ok()),
            imap_tls: parse_bool_var("IMAP_TLS"),
            data_dir: std::env::var("DATA_DIR").ok().map(PathBuf::from),
            config_path: std::env::var("CONFIG_PATH").ok().map(PathBuf::from),
        }
    }
}

fn parse_csv_var(name: &str) -> Option<Vec<String>> {
    std::env::var(name).ok().map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect()
    })
}

fn parse_bool_var(name: &str) -> Option<bool> {
    std::env::var(name).ok().and_then(|raw| match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_var_trims_and_drops_empties() {
        // SAFETY: test runs single-threaded within this process's env mutation.
        unsafe { std::env::set_var("TEST_CSV_VAR", " a, b ,,c") };
        assert_eq!(
            parse_csv_var("TEST_CSV_VAR"),
            Some(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
        unsafe { std::env::remove_var("TEST_CSV_VAR") };
    }

    #[test]
    fn bool_var_accepts_common_spellings() {
        unsafe { std::env::set_var("TEST_BOOL_VAR", "Yes") };
        assert_eq!(parse_bool_var("TEST_BOOL_VAR"), Some(true));
        unsafe { std::env::set_var("TEST_BOOL_VAR", "0") };
        assert_eq!(parse_bool_var("TEST_BOOL_VAR"), Some(false));
        unsafe { std::env::remove_var("TEST_BOOL_VAR") };
    }
}
