//! Layered configuration for the task-intake service: hardcoded defaults,
//! an optional `intake.toml`, environment variables, and CLI flag overrides,
//! composed into a single typed [`models::Config`].

pub mod cli;
pub mod error;
pub mod loader;
pub mod models;
pub mod secret;
pub mod sources;

pub use cli::Cli;
pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, ConfigLoaderOptions};
pub use models::{
    BackoffSettings, CapacityConfig, Config, ConfigMetadata, HealthSettings, ImapSettings, ServerConfig,
};
pub use secret::SecretString;
