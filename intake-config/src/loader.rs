//! Layered configuration loader: defaults hardcoded in the binary →
//! optional TOML file → environment variables (highest precedence before
//! CLI) → CLI flag overrides applied by the caller after `load()` returns.
//! Modeled on the reference server's own config loader: `.env` loading is
//! best-effort, a missing config file is not an error, and secrets support
//! `_FILE` indirection.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use once_cell::sync::Lazy;

use crate::error::ConfigError;
use crate::models::{
    BackoffSettings, CapacityConfig, Config, ConfigMetadata, HealthSettings, ImapSettings, ServerConfig,
};
use crate::secret::resolve_secret;
use crate::sources::{EnvConfig, FileConfig};

static DEFAULT_CONFIG_LOCATIONS: Lazy<Vec<PathBuf>> =
    Lazy::new(|| vec![PathBuf::from("intake.toml"), PathBuf::from("config/intake.toml")]);

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn load(&self) -> Result<Config, ConfigError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true).or_else(|err| match err {
                dotenvy::Error::Io(_) => Ok(false),
                other => Err(other),
            })?,
            None => dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                dotenvy::Error::Io(_) => Ok(false),
                other => Err(other),
            })?,
        };

        let env = EnvConfig::gather();

        let explicit_path = self.options.config_path.clone().or_else(|| env.config_path.clone());
        let (file, config_path, config_file_present) = self.load_file(explicit_path)?;

        let config = compose(file, env, ConfigMetadata {
            config_path,
            env_file_loaded,
            config_file_present,
        })?;

        Ok(config)
    }

    fn load_file(
        &self,
        explicit_path: Option<PathBuf>,
    ) -> Result<(FileConfig, Option<PathBuf>, bool), ConfigError> {
        let resolved = match explicit_path {
            Some(path) => Some((path, true)),
            None => DEFAULT_CONFIG_LOCATIONS
                .iter()
                .find(|candidate| candidate.exists())
                .map(|path| (path.clone(), false)),
        };

        let Some((path, explicit)) = resolved else {
            return Ok((FileConfig::default(), None, false));
        };

        if !path.exists() {
            if explicit {
                return Err(ConfigError::Io {
                    path,
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "config file not found"),
                });
            }
            return Ok((FileConfig::default(), None, false));
        }

        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let file: FileConfig = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;

        Ok((file, Some(path), true))
    }
}

fn compose(file: FileConfig, env: EnvConfig, metadata: ConfigMetadata) -> Result<Config, ConfigError> {
    let server = ServerConfig {
        host: file.server.host.clone().unwrap_or_else(|| "0.0.0.0".to_string()),
        port: env.port.or(file.server.port).unwrap_or(3000),
    };

    let mailboxes = env
        .mailboxes
        .clone()
        .or_else(|| env.mailbox.clone().map(|single| vec![single]))
        .or_else(|| file.mailboxes.clone())
        .ok_or(ConfigError::MissingRequired("MAILBOXES or MAILBOX"))?;
    if mailboxes.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "MAILBOXES",
            reason: "must name at least one mailbox".to_string(),
        });
    }

    let email_user = env
        .email_user
        .clone()
        .ok_or(ConfigError::MissingRequired("EMAIL_USER"))?;
    let email_pass = resolve_secret(env.email_pass.clone(), env.email_pass_file.as_deref())?
        .ok_or(ConfigError::MissingRequired("EMAIL_PASS or EMAIL_PASS_FILE"))?;

    let imap = ImapSettings {
        host: env
            .imap_host
            .clone()
            .or(file.imap.host.clone())
            .ok_or(ConfigError::MissingRequired("IMAP_HOST"))?,
        port: env.imap_port.or(file.imap.port).unwrap_or(993),
        user: email_user,
        pass: email_pass,
        use_tls: env.imap_tls.or(file.imap.use_tls).unwrap_or(true),
    };

    let capacity = CapacityConfig {
        default_words_per_day: env
            .c_default
            .or(file.capacity.default_words_per_day)
            .unwrap_or_else(|| CapacityConfig::default().default_words_per_day),
    };

    let backoff_defaults = BackoffSettings::default();
    let backoff = BackoffSettings {
        initial_delay: file
            .backoff
            .initial_delay_secs
            .map(Duration::from_secs)
            .unwrap_or(backoff_defaults.initial_delay),
        max_delay: file
            .backoff
            .max_delay_secs
            .map(Duration::from_secs)
            .unwrap_or(backoff_defaults.max_delay),
        max_retries: file.backoff.max_retries.unwrap_or(backoff_defaults.max_retries),
        max_retry_delay: file
            .backoff
            .max_retry_delay_secs
            .map(Duration::from_secs)
            .unwrap_or(backoff_defaults.max_retry_delay),
    };

    let health_defaults = HealthSettings::default();
    let health = HealthSettings {
        reconnect_threshold: file
            .health
            .reconnect_threshold
            .unwrap_or(health_defaults.reconnect_threshold),
        reconnect_window: file
            .health
            .reconnect_window_secs
            .map(Duration::from_secs)
            .unwrap_or(health_defaults.reconnect_window),
        consecutive_failure_threshold: file
            .health
            .consecutive_failure_threshold
            .unwrap_or(health_defaults.consecutive_failure_threshold),
        health_check_interval: file
            .health
            .health_check_interval_secs
            .map(Duration::from_secs)
            .unwrap_or(health_defaults.health_check_interval),
        health_check_timeout: file
            .health
            .health_check_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(health_defaults.health_check_timeout),
    };

    let allow_backfill = env.allow_backfill.or(file.allow_backfill).unwrap_or(false);
    let data_dir = env
        .data_dir
        .clone()
        .or(file.data_dir.clone())
        .unwrap_or_else(|| PathBuf::from("./data"));

    Ok(Config {
        server,
        imap,
        mailboxes,
        capacity,
        backoff,
        health,
        allow_backfill,
        data_dir,
        metadata,
    })
}
