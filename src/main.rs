//! # tickq
//!
//! Command-line host for the tick-driven timer queue.
//!
//! ## Startup Sequence
//!
//! 1. **Arguments** - Parse the command line
//! 2. **Configuration** - Load `tickq.toml` (or the `--config` path), falling
//!    back to defaults when the file does not exist
//! 3. **Tracing** - `RUST_LOG` wins over the configured `log_filter`
//! 4. **Registry** - Register every callback variant; a conflicting
//!    registration stops startup before any save file is touched
//! 5. **Command** - Load the save file, run the command, write it back

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

mod cli;
mod commands;
mod config;
mod host;
mod save;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Cli;
use crate::commands::{Session, execute_command};
use crate::config::HostConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, from_file) = load_config(&cli.config)?;
    init_tracing(&config.log_filter);

    if from_file {
        debug!(path = %cli.config.display(), "Loaded configuration");
    } else {
        info!(path = %cli.config.display(), "No configuration file, using defaults");
    }

    let registry = host::registry().context("Failed to register callback types")?;
    debug!(types = ?registry.callback_types(), "Callback registry ready");

    let session = Session {
        save_path: cli.save.unwrap_or_else(|| config.save_path.clone()),
        config,
        registry: Arc::new(registry),
    };

    execute_command(cli.command, &session)
}

/// Load the configuration, or defaults if the file is absent.
fn load_config(path: &Path) -> Result<(HostConfig, bool)> {
    if !path.exists() {
        return Ok((HostConfig::default(), false));
    }
    let config = HostConfig::from_file(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    Ok((config, true))
}

/// Initialize tracing subscriber with environment filter.
fn init_tracing(fallback: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
