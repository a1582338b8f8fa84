//! Structured lifecycle event reporting.
//!
//! The coordinator reports every transition as a [`LifecycleEvent`] to an
//! [`EventSink`]. [`TracingSink`] forwards events to `tracing`;
//! [`MemorySink`] keeps them for inspection.

use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn, Level};

use crate::scheduler::TriggerOutcome;
use crate::signal::LifecycleSignal;

/// Target used by [`TracingSink`].
pub const LIFECYCLE_TARGET: &str = "warden::lifecycle";

/// Which lifecycle transition an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Startup,
    Reload,
    Shutdown,
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transition::Startup => write!(f, "startup"),
            Transition::Reload => write!(f, "reload"),
            Transition::Shutdown => write!(f, "shutdown"),
        }
    }
}

/// A lifecycle event emitted by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// `begin()` entered; initial build about to run.
    StartupBegan,
    /// OS signal handlers installed for this run.
    SignalsInstalled,
    /// Initial build finished.
    StartupCompleted { elapsed: Duration },
    /// An OS signal arrived and is being forwarded to the event queue.
    SignalReceived {
        name: &'static str,
        signal: LifecycleSignal,
    },
    /// A signal was enqueued.
    SignalQueued { signal: LifecycleSignal },
    /// A signal was dropped because the run loop has terminated.
    SignalIgnored { signal: LifecycleSignal },
    /// A reload event was handed to the scheduler.
    ReloadScheduled { outcome: TriggerOutcome },
    /// Reload teardown is starting.
    ReloadTearDownStarted,
    /// Reload teardown finished; rebuild is starting.
    ReloadBuildUpStarted,
    /// Reload rebuild finished.
    ReloadCompleted { elapsed: Duration },
    /// Shutdown received; waiting for reloads to settle.
    Draining,
    /// Done signal closed; the run loop has terminated.
    DoneSignalled,
    /// Final teardown is starting.
    ShutdownBegan,
    /// Final teardown finished.
    ShutdownCompleted { elapsed: Duration },
    /// A transition took longer than the configured threshold.
    SlowTransition {
        transition: Transition,
        elapsed: Duration,
        threshold: Duration,
    },
}

impl LifecycleEvent {
    /// Severity this event should be reported at.
    pub fn level(&self) -> Level {
        match self {
            LifecycleEvent::StartupBegan
            | LifecycleEvent::SignalReceived { .. }
            | LifecycleEvent::StartupCompleted { .. }
            | LifecycleEvent::ReloadCompleted { .. }
            | LifecycleEvent::ShutdownBegan
            | LifecycleEvent::ShutdownCompleted { .. } => Level::INFO,
            LifecycleEvent::SlowTransition { .. } => Level::WARN,
            _ => Level::DEBUG,
        }
    }

    /// Short machine-readable name.
    pub fn kind(&self) -> &'static str {
        match self {
            LifecycleEvent::StartupBegan => "startup_began",
            LifecycleEvent::SignalsInstalled => "signals_installed",
            LifecycleEvent::StartupCompleted { .. } => "startup_completed",
            LifecycleEvent::SignalReceived { .. } => "signal_received",
            LifecycleEvent::SignalQueued { .. } => "signal_queued",
            LifecycleEvent::SignalIgnored { .. } => "signal_ignored",
            LifecycleEvent::ReloadScheduled { .. } => "reload_scheduled",
            LifecycleEvent::ReloadTearDownStarted => "reload_tear_down_started",
            LifecycleEvent::ReloadBuildUpStarted => "reload_build_up_started",
            LifecycleEvent::ReloadCompleted { .. } => "reload_completed",
            LifecycleEvent::Draining => "draining",
            LifecycleEvent::DoneSignalled => "done_signalled",
            LifecycleEvent::ShutdownBegan => "shutdown_began",
            LifecycleEvent::ShutdownCompleted { .. } => "shutdown_completed",
            LifecycleEvent::SlowTransition { .. } => "slow_transition",
        }
    }

    /// Duration carried by the event, if any.
    pub fn elapsed(&self) -> Option<Duration> {
        match self {
            LifecycleEvent::StartupCompleted { elapsed }
            | LifecycleEvent::ReloadCompleted { elapsed }
            | LifecycleEvent::ShutdownCompleted { elapsed }
            | LifecycleEvent::SlowTransition { elapsed, .. } => Some(*elapsed),
            _ => None,
        }
    }
}

impl std::fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleEvent::StartupBegan => write!(f, "Starting up..."),
            LifecycleEvent::SignalsInstalled => write!(f, "Signal setup complete"),
            LifecycleEvent::StartupCompleted { elapsed } => {
                write!(f, "Took {:?} to start up", elapsed)
            }
            LifecycleEvent::SignalReceived { name, signal } => {
                write!(f, "Received {}, requesting {}", name, signal)
            }
            LifecycleEvent::SignalQueued { signal } => write!(f, "Queued {} signal", signal),
            LifecycleEvent::SignalIgnored { signal } => {
                write!(f, "Ignored {} signal: run loop has terminated", signal)
            }
            LifecycleEvent::ReloadScheduled { outcome } => {
                write!(f, "Scheduling reload ({})", outcome)
            }
            LifecycleEvent::ReloadTearDownStarted => write!(f, "Reload tear down start"),
            LifecycleEvent::ReloadBuildUpStarted => write!(f, "Reload build up start"),
            LifecycleEvent::ReloadCompleted { elapsed } => {
                write!(f, "Took {:?} to reload", elapsed)
            }
            LifecycleEvent::Draining => write!(f, "Waiting for reload completion..."),
            LifecycleEvent::DoneSignalled => write!(f, "Done signal closed"),
            LifecycleEvent::ShutdownBegan => write!(f, "Shutting down..."),
            LifecycleEvent::ShutdownCompleted { elapsed } => {
                write!(f, "Took {:?} to shut down", elapsed)
            }
            LifecycleEvent::SlowTransition {
                transition,
                elapsed,
                threshold,
            } => write!(
                f,
                "{} took {:?}, longer than {:?}",
                transition, elapsed, threshold
            ),
        }
    }
}

/// Destination for lifecycle events.
pub trait EventSink: Send + Sync {
    /// Record one event.
    fn record(&self, event: &LifecycleEvent);
}

/// Sink that forwards events to `tracing` under [`LIFECYCLE_TARGET`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: &LifecycleEvent) {
        let kind = event.kind();
        let elapsed_ms = event.elapsed().map(|d| d.as_millis() as u64);

        match event.level() {
            Level::WARN => warn!(target: LIFECYCLE_TARGET, kind, elapsed_ms, "{}", event),
            Level::INFO => info!(target: LIFECYCLE_TARGET, kind, elapsed_ms, "{}", event),
            _ => debug!(target: LIFECYCLE_TARGET, kind, elapsed_ms, "{}", event),
        }
    }
}

/// Sink that keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded events, oldest first.
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().clone()
    }

    /// Number of recorded events with the given kind.
    pub fn count(&self, kind: &str) -> usize {
        self.events.lock().iter().filter(|e| e.kind() == kind).count()
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: &LifecycleEvent) {
        self.events.lock().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_levels() {
        assert_eq!(LifecycleEvent::StartupBegan.level(), Level::INFO);
        assert_eq!(LifecycleEvent::Draining.level(), Level::DEBUG);
        assert_eq!(
            LifecycleEvent::SlowTransition {
                transition: Transition::Reload,
                elapsed: Duration::from_secs(40),
                threshold: Duration::from_secs(30),
            }
            .level(),
            Level::WARN
        );
    }

    #[test]
    fn test_event_display() {
        let event = LifecycleEvent::StartupCompleted {
            elapsed: Duration::from_millis(1500),
        };
        assert_eq!(event.to_string(), "Took 1.5s to start up");
        assert_eq!(event.elapsed(), Some(Duration::from_millis(1500)));

        let ignored = LifecycleEvent::SignalIgnored {
            signal: LifecycleSignal::Reload,
        };
        assert!(ignored.to_string().contains("reload"));
        assert_eq!(ignored.elapsed(), None);

        let received = LifecycleEvent::SignalReceived {
            name: "SIGHUP",
            signal: LifecycleSignal::Reload,
        };
        assert_eq!(received.to_string(), "Received SIGHUP, requesting reload");
        assert_eq!(received.kind(), "signal_received");
        assert_eq!(received.level(), Level::INFO);
    }

    #[test]
    fn test_memory_sink_records_in_order() {
        let sink = MemorySink::new();
        sink.record(&LifecycleEvent::StartupBegan);
        sink.record(&LifecycleEvent::Draining);
        sink.record(&LifecycleEvent::Draining);

        let events = sink.events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], LifecycleEvent::StartupBegan);
        assert_eq!(sink.count("draining"), 2);
        assert_eq!(sink.count("shutdown_began"), 0);
    }

    #[test]
    fn test_tracing_sink_accepts_every_level() {
        let sink = TracingSink;
        sink.record(&LifecycleEvent::StartupBegan);
        sink.record(&LifecycleEvent::Draining);
        sink.record(&LifecycleEvent::SlowTransition {
            transition: Transition::Shutdown,
            elapsed: Duration::from_secs(31),
            threshold: Duration::from_secs(30),
        });
    }
}
