//! Lifecycle signals and OS signal bridging.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::LifecycleError;
use crate::sink::{EventSink, LifecycleEvent};

/// Event consumed by the coordinator's run loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleSignal {
    /// Tear down and rebuild (SIGHUP).
    Reload,
    /// Tear down and exit (SIGTERM, SIGINT).
    Shutdown,
}

impl std::fmt::Display for LifecycleSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleSignal::Reload => write!(f, "reload"),
            LifecycleSignal::Shutdown => write!(f, "shutdown"),
        }
    }
}

/// Forwards OS signals into a coordinator's event queue.
///
/// Every received signal is recorded as [`LifecycleEvent::SignalReceived`]
/// on the coordinator's sink before it is queued.
///
/// The subscription lives exactly as long as this value: dropping it stops
/// forwarding. Each coordinator run owns its own bridge, so several
/// coordinators in one process do not share state.
pub(crate) struct SignalBridge {
    task: JoinHandle<()>,
}

impl SignalBridge {
    /// Subscribe to SIGTERM, SIGINT and SIGHUP.
    #[cfg(unix)]
    pub(crate) fn install(
        sender: mpsc::Sender<LifecycleSignal>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, LifecycleError> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm =
            signal(SignalKind::terminate()).map_err(|e| LifecycleError::SignalSetup(e.to_string()))?;
        let mut sigint =
            signal(SignalKind::interrupt()).map_err(|e| LifecycleError::SignalSetup(e.to_string()))?;
        let mut sighup =
            signal(SignalKind::hangup()).map_err(|e| LifecycleError::SignalSetup(e.to_string()))?;

        let task = tokio::spawn(async move {
            loop {
                let (name, event) = tokio::select! {
                    Some(()) = sigterm.recv() => ("SIGTERM", LifecycleSignal::Shutdown),
                    Some(()) = sigint.recv() => ("SIGINT", LifecycleSignal::Shutdown),
                    Some(()) = sighup.recv() => ("SIGHUP", LifecycleSignal::Reload),
                    else => break,
                };
                sink.record(&LifecycleEvent::SignalReceived { name, signal: event });

                if sender.send(event).await.is_err() {
                    debug!("Event queue closed, signal bridge exiting");
                    break;
                }
            }
        });

        Ok(Self { task })
    }

    /// Subscribe to Ctrl+C (non-Unix fallback).
    #[cfg(not(unix))]
    pub(crate) fn install(
        sender: mpsc::Sender<LifecycleSignal>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, LifecycleError> {
        let task = tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                sink.record(&LifecycleEvent::SignalReceived {
                    name: "Ctrl+C",
                    signal: LifecycleSignal::Shutdown,
                });
                if sender.send(LifecycleSignal::Shutdown).await.is_err() {
                    break;
                }
            }
        });

        Ok(Self { task })
    }
}

impl Drop for SignalBridge {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Send a lifecycle signal to another process.
///
/// PID 0 is rejected: `kill(0, ..)` would signal the caller's whole process
/// group.
#[cfg(unix)]
pub fn send_signal_to_pid(pid: u32, signal: LifecycleSignal) -> Result<(), LifecycleError> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    if pid == 0 {
        return Err(LifecycleError::SignalDelivery {
            pid,
            reason: "PID 0 addresses the process group".to_string(),
        });
    }

    let pid_raw = i32::try_from(pid).map_err(|_| LifecycleError::SignalDelivery {
        pid,
        reason: "PID out of range".to_string(),
    })?;

    let nix_signal = match signal {
        LifecycleSignal::Reload => Signal::SIGHUP,
        LifecycleSignal::Shutdown => Signal::SIGTERM,
    };

    kill(Pid::from_raw(pid_raw), nix_signal).map_err(|e| LifecycleError::SignalDelivery {
        pid,
        reason: e.to_string(),
    })?;

    info!("Sent {} to PID {}", signal, pid);
    Ok(())
}

#[cfg(not(unix))]
pub fn send_signal_to_pid(pid: u32, _signal: LifecycleSignal) -> Result<(), LifecycleError> {
    Err(LifecycleError::SignalDelivery {
        pid,
        reason: "signal sending not supported on this platform".to_string(),
    })
}

#[cfg(test)]
#[path = "signal_tests.rs"]
mod tests;
