//! Coordinator phase and run loop state.

use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle phase of the managed unit.
///
/// Starting, reloading and stopping are mutually exclusive by construction:
/// they are variants of one value rather than independent flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Phase {
    /// `begin()` has not been called yet.
    Idle = 0,
    /// Initial `build_up(true)` in progress.
    Starting = 1,
    /// Built up and serving.
    Active = 2,
    /// Reload tear-down/build-up pair in progress.
    Reloading = 3,
    /// Final `tear_down(true)` in progress.
    Stopping = 4,
    /// Final teardown finished.
    Stopped = 5,
}

impl From<u8> for Phase {
    fn from(v: u8) -> Self {
        match v {
            0 => Phase::Idle,
            1 => Phase::Starting,
            2 => Phase::Active,
            3 => Phase::Reloading,
            4 => Phase::Stopping,
            _ => Phase::Stopped,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::Starting => write!(f, "starting"),
            Phase::Active => write!(f, "active"),
            Phase::Reloading => write!(f, "reloading"),
            Phase::Stopping => write!(f, "stopping"),
            Phase::Stopped => write!(f, "stopped"),
        }
    }
}

/// Phase held in a single atomic cell.
#[derive(Debug)]
pub(crate) struct AtomicPhase(AtomicU8);

impl AtomicPhase {
    pub(crate) fn new(phase: Phase) -> Self {
        Self(AtomicU8::new(phase as u8))
    }

    pub(crate) fn load(&self) -> Phase {
        Phase::from(self.0.load(Ordering::SeqCst))
    }

    pub(crate) fn store(&self, phase: Phase) {
        self.0.store(phase as u8, Ordering::SeqCst);
    }
}

/// State of the coordinator's run loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LoopState {
    /// Waiting on the event queue.
    WaitingForEvent = 0,
    /// Handing a reload to the scheduler.
    ProcessingReload = 1,
    /// Shutdown received; waiting for reload quiescence.
    Draining = 2,
    /// Loop has exited.
    Terminated = 3,
}

impl From<u8> for LoopState {
    fn from(v: u8) -> Self {
        match v {
            0 => LoopState::WaitingForEvent,
            1 => LoopState::ProcessingReload,
            2 => LoopState::Draining,
            _ => LoopState::Terminated,
        }
    }
}

impl std::fmt::Display for LoopState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoopState::WaitingForEvent => write!(f, "waiting_for_event"),
            LoopState::ProcessingReload => write!(f, "processing_reload"),
            LoopState::Draining => write!(f, "draining"),
            LoopState::Terminated => write!(f, "terminated"),
        }
    }
}

#[derive(Debug)]
pub(crate) struct AtomicLoopState(AtomicU8);

impl AtomicLoopState {
    pub(crate) fn new(state: LoopState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub(crate) fn load(&self) -> LoopState {
        LoopState::from(self.0.load(Ordering::SeqCst))
    }

    pub(crate) fn store(&self, state: LoopState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }
}
