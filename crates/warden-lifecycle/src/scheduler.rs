//! Coalescing job scheduler.
//!
//! Runs an async job with at most one execution in flight and at most one
//! more owed. Triggers that arrive while a run is in flight and another is
//! already owed are merged into the owed run instead of queueing.
//!
//! ```text
//!   trigger ──► idle? ──yes──► running=true, spawn run ──► Started
//!                 │
//!                 no ──► pending? ──no──► pending=true ──► Queued
//!                            │
//!                           yes ──────────────────────────► Coalesced
//!
//!   run completes ──► pending? ──yes──► pending=false, run again
//!                        │
//!                        no ──► running=false, wake waiters
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use tokio::sync::Notify;

type Job = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// What a call to [`CoalescingScheduler::trigger`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// Scheduler was idle; a run started.
    Started,
    /// A run was in flight; one follow-up run is now owed.
    Queued,
    /// A follow-up was already owed; this trigger merged into it.
    Coalesced,
}

impl std::fmt::Display for TriggerOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerOutcome::Started => write!(f, "started"),
            TriggerOutcome::Queued => write!(f, "queued"),
            TriggerOutcome::Coalesced => write!(f, "coalesced"),
        }
    }
}

#[derive(Debug, Default)]
struct Flags {
    running: bool,
    pending: bool,
}

struct Inner {
    flags: Mutex<Flags>,
    idle: Notify,
    job: Job,
    completed: AtomicU64,
}

/// Serializes executions of a job and coalesces bursts of triggers.
#[derive(Clone)]
pub struct CoalescingScheduler {
    inner: Arc<Inner>,
}

impl CoalescingScheduler {
    /// Create a scheduler for `job`.
    pub fn new<F, Fut>(job: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let job: Job = Arc::new(move || job().boxed());
        Self {
            inner: Arc::new(Inner {
                flags: Mutex::new(Flags::default()),
                idle: Notify::new(),
                job,
                completed: AtomicU64::new(0),
            }),
        }
    }

    /// Request a run. Never waits for the job.
    ///
    /// Must be called from within a tokio runtime.
    pub fn trigger(&self) -> TriggerOutcome {
        let mut flags = self.inner.flags.lock();
        if !flags.running {
            flags.running = true;
            drop(flags);
            self.spawn_run();
            TriggerOutcome::Started
        } else if !flags.pending {
            flags.pending = true;
            TriggerOutcome::Queued
        } else {
            TriggerOutcome::Coalesced
        }
    }

    /// Wait until no run is in flight and none is owed.
    pub async fn wait(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            // Register before checking so a completion in between is not missed.
            notified.as_mut().enable();

            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }

    /// Whether no run is in flight and none is owed.
    pub fn is_idle(&self) -> bool {
        let flags = self.inner.flags.lock();
        !flags.running && !flags.pending
    }

    /// Number of runs that finished.
    pub fn completed_runs(&self) -> u64 {
        self.inner.completed.load(Ordering::SeqCst)
    }

    fn spawn_run(&self) {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            let mut guard = RunGuard {
                inner: inner.clone(),
                finished: false,
            };

            loop {
                (inner.job)().await;
                inner.completed.fetch_add(1, Ordering::SeqCst);

                let again = {
                    let mut flags = inner.flags.lock();
                    if flags.pending {
                        flags.pending = false;
                        true
                    } else {
                        flags.running = false;
                        false
                    }
                };

                if !again {
                    break;
                }
            }

            guard.finished = true;
        });
    }
}

/// Wakes waiters when a run task ends, and clears the flags if it ended by
/// unwinding out of the job.
struct RunGuard {
    inner: Arc<Inner>,
    finished: bool,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if !self.finished {
            let mut flags = self.inner.flags.lock();
            flags.running = false;
            flags.pending = false;
        }
        self.inner.idle.notify_waiters();
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
