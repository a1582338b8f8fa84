//! Heartbeat unit: a periodic log line managed by the lifecycle coordinator.
//!
//! Every reload re-reads the configuration file and restarts the ticker
//! with the new interval and message. A configuration that fails to load
//! is logged and the previous settings stay in effect.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use warden_lifecycle::ManagedUnit;

use crate::config::{ConfigLoader, HeartbeatConfig};

struct Ticker {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

struct State {
    settings: HeartbeatConfig,
    ticker: Option<Ticker>,
}

/// Logs `message` every `interval_secs` while built up.
pub(crate) struct HeartbeatUnit {
    config_path: Option<PathBuf>,
    state: Mutex<State>,
    beats: Arc<AtomicU64>,
}

impl HeartbeatUnit {
    /// Create a unit with initial settings. With a `config_path`, reloads
    /// pick up the `[heartbeat]` section from that file.
    pub fn new(settings: HeartbeatConfig, config_path: Option<PathBuf>) -> Self {
        Self {
            config_path,
            state: Mutex::new(State {
                settings,
                ticker: None,
            }),
            beats: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Total beats since creation.
    pub fn beats(&self) -> u64 {
        self.beats.load(Ordering::SeqCst)
    }

    fn reread(&self, current: &HeartbeatConfig) -> HeartbeatConfig {
        let Some(path) = &self.config_path else {
            return current.clone();
        };
        match ConfigLoader::load_or_default(path) {
            Ok(config) => config.heartbeat,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Keeping previous heartbeat settings");
                current.clone()
            }
        }
    }
}

fn spawn_ticker(settings: &HeartbeatConfig, beats: Arc<AtomicU64>) -> Ticker {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let interval = settings.interval();
    let message = settings.message.clone();

    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(interval) => {
                    let beat = beats.fetch_add(1, Ordering::SeqCst) + 1;
                    info!(beat, "{}", message);
                }
            }
        }
    });

    Ticker { cancel, task }
}

#[async_trait]
impl ManagedUnit for HeartbeatUnit {
    async fn build_up(&self, startup: bool) {
        let mut state = self.state.lock().await;
        if !startup {
            state.settings = self.reread(&state.settings);
        }
        if let Some(old) = state.ticker.take() {
            old.cancel.cancel();
            let _ = old.task.await;
        }
        info!(
            interval_secs = state.settings.interval_secs,
            startup, "Heartbeat started"
        );
        state.ticker = Some(spawn_ticker(&state.settings, self.beats.clone()));
    }

    async fn tear_down(&self, stopping: bool) {
        let mut state = self.state.lock().await;
        if let Some(ticker) = state.ticker.take() {
            ticker.cancel.cancel();
            let _ = ticker.task.await;
        }
        if stopping {
            info!(beats = self.beats(), "Heartbeat stopped");
        }
    }
}

#[cfg(test)]
#[path = "heartbeat_tests.rs"]
mod tests;
