//! Command line, logging and shutdown plumbing shared by the node binaries.

use crate::config::Config;
use clap::Parser;
use eyre::Result;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Args {
    /// YAML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl Args {
    pub fn load_config(&self) -> Result<Config> {
        match &self.config {
            Some(path) => {
                info!(config_file = %path.display(), "Loading configuration");
                Config::load(path)
            }
            None => {
                info!("No config file given, using defaults");
                let config = Config::default();
                config.validate()?;
                Ok(config)
            }
        }
    }
}

/// Log to stderr, filtered by `RUST_LOG` (default `info`).
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Resolves on Ctrl-C.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Unable to listen for Ctrl-C, running until killed");
        std::future::pending::<()>().await;
    }
}
