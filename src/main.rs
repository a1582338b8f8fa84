//! Warden - supervised heartbeat service.
//!
//! Runs a [`HeartbeatUnit`](heartbeat::HeartbeatUnit) under the lifecycle
//! coordinator: SIGHUP reloads the configuration, SIGTERM/SIGINT shut down.

mod cli;
mod config;
mod heartbeat;
mod logging;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use warden_lifecycle::{send_signal_to_pid, Coordinator, LifecycleSignal};

use crate::cli::{Cli, Commands};
use crate::config::{default_config_path, ConfigLoader};
use crate::heartbeat::HeartbeatUnit;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(default_config_path);

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(&config_path, cli.log_level).await,
        Commands::Signal { action, pid } => {
            logging::init_tracing(cli.log_level.as_deref().unwrap_or("info"), None)?;
            signal(pid, action.into())
        }
        Commands::CheckConfig => check_config(&config_path),
    }
}

/// Run in the foreground until shutdown.
async fn run(
    config_path: &Path,
    log_level: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigLoader::load_or_default(config_path)?;
    let level = log_level.unwrap_or_else(|| config.logging.level.clone());
    logging::init_tracing(&level, config.logging.file_dir.as_deref())?;

    info!("Starting Warden v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: {}", config_path.display());

    let unit = Arc::new(HeartbeatUnit::new(
        config.heartbeat.clone(),
        Some(PathBuf::from(config_path)),
    ));
    let coordinator = Coordinator::builder()
        .unit(unit)
        .tracing_sink()
        .config(config.lifecycle)
        .build()?;

    info!("Running (pid {}), send SIGHUP to reload", std::process::id());
    coordinator.begin().await?;

    info!("Warden stopped");
    Ok(())
}

/// Deliver a lifecycle signal to a running instance.
fn signal(pid: u32, signal: LifecycleSignal) -> Result<(), Box<dyn std::error::Error>> {
    send_signal_to_pid(pid, signal)?;
    info!(pid, %signal, "Signal sent");
    Ok(())
}

/// Validate the configuration file.
fn check_config(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigLoader::load(config_path)?;
    println!("Configuration OK: {}", config_path.display());
    println!(
        "  heartbeat every {}s, slow transition threshold {}s, OS signals {}",
        config.heartbeat.interval_secs,
        config.lifecycle.slow_transition_secs,
        if config.lifecycle.handle_os_signals {
            "on"
        } else {
            "off"
        }
    );
    Ok(())
}
