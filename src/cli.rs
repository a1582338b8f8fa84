//! CLI definitions for Warden.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use warden_lifecycle::LifecycleSignal;

/// Warden CLI.
#[derive(Parser)]
#[command(name = "warden")]
#[command(about = "Supervised heartbeat service with graceful reload and shutdown")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (defaults to ~/.warden/warden.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter, overrides `[logging] level`
    #[arg(long, global = true, env = "WARDEN_LOG_LEVEL")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run in the foreground until SIGTERM/SIGINT (default)
    Run,

    /// Ask a running warden to reload or shut down
    Signal {
        /// What to request
        #[arg(value_enum)]
        action: SignalAction,

        /// Process ID of the running warden
        #[arg(long)]
        pid: u32,
    },

    /// Load and validate the configuration file, then exit
    CheckConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum SignalAction {
    Reload,
    Shutdown,
}

impl From<SignalAction> for LifecycleSignal {
    fn from(action: SignalAction) -> Self {
        match action {
            SignalAction::Reload => LifecycleSignal::Reload,
            SignalAction::Shutdown => LifecycleSignal::Shutdown,
        }
    }
}
