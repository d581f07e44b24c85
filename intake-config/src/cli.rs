//! Command-line overrides for the handful of operationally-hot fields.
//! Everything else is config-file/env territory; see [`crate::loader`].

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "intake-server", about = "Task-intake automation service")]
pub struct Cli {
    /// Path to the TOML config file. Overrides CONFIG_PATH and the default
    /// search locations.
    #[arg(long, env = "CONFIG_PATH")]
    pub config: Option<PathBuf>,

    /// Dashboard HTTP port. Overrides PORT and the config file.
    #[arg(long)]
    pub port: Option<u16>,

    /// Data directory for persisted ledger/cursor/override state.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

impl Cli {
    /// Apply CLI overrides onto an already-loaded configuration.
    pub fn apply(&self, config: &mut crate::models::Config) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(data_dir) = &self.data_dir {
            config.data_dir = data_dir.clone();
        }
    }
}
