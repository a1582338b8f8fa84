//! The lifecycle coordinator.
//!
//! [`Coordinator::begin`] builds the managed unit up, then serves reload and
//! shutdown events from a capacity-1 queue until a shutdown arrives, and
//! finally tears the unit down. Events come from [`Coordinator::signal_reload`],
//! [`Coordinator::signal_shutdown`] and, when enabled, OS signals.
//!
//! ```text
//!  signal_reload ─┐                        ┌─ Reload ──► CoalescingScheduler
//!  signal_shutdown├─► event queue (cap 1) ─┤              (tear_down(false),
//!  SIGHUP/TERM/INT┘                        │               build_up(false))
//!                                          └─ Shutdown ─► wait for quiescence
//!                                                          └─► done signal
//!                                                               └─► begin():
//!                                                                   tear_down(true)
//! ```

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::LifecycleConfig;
use crate::error::{LifecycleError, LifecycleResult};
use crate::scheduler::CoalescingScheduler;
use crate::signal::{LifecycleSignal, SignalBridge};
use crate::sink::{EventSink, LifecycleEvent, TracingSink, Transition};
use crate::state::{AtomicLoopState, AtomicPhase, LoopState, Phase};
use crate::unit::ManagedUnit;

/// Capacity of the event queue. Senders wait while it is full.
pub const EVENT_QUEUE_CAPACITY: usize = 1;

struct Shared {
    unit: Arc<dyn ManagedUnit>,
    sink: Arc<dyn EventSink>,
    config: LifecycleConfig,
    phase: Arc<AtomicPhase>,
    loop_state: AtomicLoopState,
    events_tx: mpsc::Sender<LifecycleSignal>,
    events_rx: Mutex<Option<mpsc::Receiver<LifecycleSignal>>>,
    done: CancellationToken,
    begin_guard: tokio::sync::Mutex<()>,
    reloads: CoalescingScheduler,
}

impl Shared {
    fn record(&self, event: LifecycleEvent) {
        self.sink.record(&event);
    }

    fn set_loop_state(&self, state: LoopState) {
        self.loop_state.store(state);
    }
}

/// Handle to a lifecycle coordinator.
///
/// Cloning is cheap; all clones drive the same coordinator, so one task can
/// sit in [`begin`](Self::begin) while others signal and query it.
#[derive(Clone)]
pub struct Coordinator {
    shared: Arc<Shared>,
}

impl Coordinator {
    /// Start building a coordinator.
    pub fn builder() -> CoordinatorBuilder {
        CoordinatorBuilder::new()
    }

    /// Create a coordinator with the default configuration.
    pub fn new(unit: Arc<dyn ManagedUnit>, sink: Arc<dyn EventSink>) -> LifecycleResult<Self> {
        Self::builder().unit(unit).sink(sink).build()
    }

    /// Run the managed unit until shutdown.
    ///
    /// Performs `build_up(true)`, serves reload events, and on shutdown waits
    /// for any in-flight or owed reload before `tear_down(true)`. Returns once
    /// the final teardown has completed.
    ///
    /// A coordinator runs once. A concurrent second call waits for the first
    /// run to finish completely and then returns
    /// [`LifecycleError::AlreadyCompleted`] without touching the unit.
    pub async fn begin(&self) -> LifecycleResult<()> {
        let shared = &self.shared;
        let _guard = shared.begin_guard.lock().await;

        let events = shared
            .events_rx
            .lock()
            .take()
            .ok_or(LifecycleError::AlreadyCompleted)?;

        shared.phase.store(Phase::Starting);
        shared.record(LifecycleEvent::StartupBegan);
        let started = Instant::now();

        let bridge = if shared.config.handle_os_signals {
            match SignalBridge::install(shared.events_tx.clone(), shared.sink.clone()) {
                Ok(bridge) => {
                    shared.record(LifecycleEvent::SignalsInstalled);
                    Some(bridge)
                }
                Err(e) => {
                    *shared.events_rx.lock() = Some(events);
                    shared.phase.store(Phase::Idle);
                    return Err(e);
                }
            }
        } else {
            None
        };

        shared.unit.build_up(true).await;
        shared.phase.store(Phase::Active);
        self.report_duration(Transition::Startup, started.elapsed());

        // Events queued while starting are served from here on, in order.
        let mut run_loop = tokio::spawn(run_loop(shared.clone(), events));

        let loop_exit = tokio::select! {
            _ = shared.done.cancelled() => None,
            result = &mut run_loop => Some(result),
        };

        drop(bridge);
        shared.phase.store(Phase::Stopping);
        shared.record(LifecycleEvent::ShutdownBegan);
        let stopping = Instant::now();

        shared.unit.tear_down(true).await;
        shared.phase.store(Phase::Stopped);
        self.report_duration(Transition::Shutdown, stopping.elapsed());

        let joined = match loop_exit {
            Some(result) => result,
            None => run_loop.await,
        };
        joined.map_err(|e| LifecycleError::RunLoop(e.to_string()))
    }

    /// Request a reload.
    ///
    /// Waits only while the event queue is full. After the coordinator has
    /// shut down this does nothing.
    pub async fn signal_reload(&self) {
        self.signal(LifecycleSignal::Reload).await;
    }

    /// Request a shutdown.
    ///
    /// Same queueing behavior as [`signal_reload`](Self::signal_reload).
    pub async fn signal_shutdown(&self) {
        self.signal(LifecycleSignal::Shutdown).await;
    }

    async fn signal(&self, signal: LifecycleSignal) {
        match self.shared.events_tx.send(signal).await {
            Ok(()) => self.shared.record(LifecycleEvent::SignalQueued { signal }),
            Err(_) => self.shared.record(LifecycleEvent::SignalIgnored { signal }),
        }
    }

    /// True only during the initial build.
    pub fn starting(&self) -> bool {
        self.phase() == Phase::Starting
    }

    /// True while a reload's teardown/rebuild pair runs.
    pub fn reloading(&self) -> bool {
        self.phase() == Phase::Reloading
    }

    /// True during the final teardown.
    pub fn stopping(&self) -> bool {
        self.phase() == Phase::Stopping
    }

    /// True while built up and not reloading.
    pub fn active(&self) -> bool {
        self.phase() == Phase::Active
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.shared.phase.load()
    }

    /// Current run loop state.
    pub fn loop_state(&self) -> LoopState {
        self.shared.loop_state.load()
    }

    fn report_duration(&self, transition: Transition, elapsed: Duration) {
        let shared = &self.shared;
        match transition {
            Transition::Startup => shared.record(LifecycleEvent::StartupCompleted { elapsed }),
            Transition::Reload => shared.record(LifecycleEvent::ReloadCompleted { elapsed }),
            Transition::Shutdown => shared.record(LifecycleEvent::ShutdownCompleted { elapsed }),
        }
        report_if_slow(shared.sink.as_ref(), &shared.config, transition, elapsed);
    }
}

fn report_if_slow(
    sink: &dyn EventSink,
    config: &LifecycleConfig,
    transition: Transition,
    elapsed: Duration,
) {
    let threshold = config.slow_transition();
    if elapsed > threshold {
        sink.record(&LifecycleEvent::SlowTransition {
            transition,
            elapsed,
            threshold,
        });
    }
}

enum Wake {
    Done,
    Event(Option<LifecycleSignal>),
}

/// Serve the event queue until shutdown. Owns the receiver; returning drops
/// it, so later signals are ignored.
async fn run_loop(shared: Arc<Shared>, mut events: mpsc::Receiver<LifecycleSignal>) {
    loop {
        shared.set_loop_state(LoopState::WaitingForEvent);

        let wake = tokio::select! {
            biased;
            _ = shared.done.cancelled() => Wake::Done,
            event = events.recv() => Wake::Event(event),
        };

        match wake {
            Wake::Done => break,
            Wake::Event(Some(LifecycleSignal::Reload)) => {
                shared.set_loop_state(LoopState::ProcessingReload);
                let outcome = shared.reloads.trigger();
                shared.record(LifecycleEvent::ReloadScheduled { outcome });
            }
            Wake::Event(Some(LifecycleSignal::Shutdown)) | Wake::Event(None) => {
                shared.set_loop_state(LoopState::Draining);
                shared.record(LifecycleEvent::Draining);
                shared.reloads.wait().await;
                shared.done.cancel();
                shared.record(LifecycleEvent::DoneSignalled);
                break;
            }
        }
    }

    shared.set_loop_state(LoopState::Terminated);
}

/// Build the reload job: `tear_down(false)` then `build_up(false)`, with the
/// phase set to reloading for the duration.
fn reload_scheduler(
    unit: Arc<dyn ManagedUnit>,
    sink: Arc<dyn EventSink>,
    phase: Arc<AtomicPhase>,
    config: LifecycleConfig,
) -> CoalescingScheduler {
    CoalescingScheduler::new(move || {
        let unit = unit.clone();
        let sink = sink.clone();
        let phase = phase.clone();
        let config = config.clone();
        async move {
            let started = Instant::now();
            phase.store(Phase::Reloading);

            sink.record(&LifecycleEvent::ReloadTearDownStarted);
            unit.tear_down(false).await;
            sink.record(&LifecycleEvent::ReloadBuildUpStarted);
            unit.build_up(false).await;

            phase.store(Phase::Active);
            let elapsed = started.elapsed();
            sink.record(&LifecycleEvent::ReloadCompleted { elapsed });
            report_if_slow(sink.as_ref(), &config, Transition::Reload, elapsed);
        }
    })
}

/// Builder for [`Coordinator`].
pub struct CoordinatorBuilder {
    unit: Option<Arc<dyn ManagedUnit>>,
    sink: Option<Arc<dyn EventSink>>,
    config: LifecycleConfig,
}

impl CoordinatorBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            unit: None,
            sink: None,
            config: LifecycleConfig::default(),
        }
    }

    /// Set the managed unit.
    pub fn unit(mut self, unit: Arc<dyn ManagedUnit>) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Set the event sink.
    pub fn sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Use [`TracingSink`] as the event sink.
    pub fn tracing_sink(self) -> Self {
        self.sink(Arc::new(TracingSink))
    }

    /// Set the configuration.
    pub fn config(mut self, config: LifecycleConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate inputs and build the coordinator.
    pub fn build(self) -> LifecycleResult<Coordinator> {
        let unit = self.unit.ok_or(LifecycleError::MissingUnit)?;
        let sink = self.sink.ok_or(LifecycleError::MissingSink)?;
        self.config.validate().map_err(LifecycleError::Config)?;

        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let phase = Arc::new(AtomicPhase::new(Phase::Idle));
        let reloads = reload_scheduler(unit.clone(), sink.clone(), phase.clone(), self.config.clone());

        Ok(Coordinator {
            shared: Arc::new(Shared {
                unit,
                sink,
                config: self.config,
                phase,
                loop_state: AtomicLoopState::new(LoopState::WaitingForEvent),
                events_tx,
                events_rx: Mutex::new(Some(events_rx)),
                done: CancellationToken::new(),
                begin_guard: tokio::sync::Mutex::new(()),
                reloads,
            }),
        })
    }
}

impl Default for CoordinatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
