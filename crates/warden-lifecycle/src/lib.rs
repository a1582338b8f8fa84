//! # Warden Lifecycle
//!
//! Startup, reload and shutdown coordination for long-running processes.
//!
//! ## Features
//!
//! - One initial build, any number of reloads, one final teardown
//! - Signal handling (SIGTERM/SIGINT for graceful shutdown, SIGHUP for reload)
//! - Reload coalescing: bursts of reload requests collapse into at most one
//!   follow-up run
//! - Shutdown never interrupts a reload: it waits for reload quiescence
//! - Structured lifecycle events through a pluggable [`EventSink`]
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use warden_lifecycle::{Coordinator, ManagedUnit};
//!
//! struct Server;
//!
//! #[async_trait]
//! impl ManagedUnit for Server {
//!     async fn build_up(&self, startup: bool) { /* open listeners */ }
//!     async fn tear_down(&self, stopping: bool) { /* close listeners */ }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), warden_lifecycle::LifecycleError> {
//!     let coordinator = Coordinator::builder()
//!         .unit(Arc::new(Server))
//!         .tracing_sink()
//!         .build()?;
//!
//!     // Blocks until SIGTERM/SIGINT or `signal_shutdown()`.
//!     coordinator.begin().await
//! }
//! ```

pub mod config;
pub mod coordinator;
pub mod error;
pub mod scheduler;
pub mod signal;
pub mod sink;
pub mod state;
pub mod unit;

// Re-exports
pub use config::LifecycleConfig;
pub use coordinator::{Coordinator, CoordinatorBuilder, EVENT_QUEUE_CAPACITY};
pub use error::{LifecycleError, LifecycleResult};
pub use scheduler::{CoalescingScheduler, TriggerOutcome};
pub use signal::{send_signal_to_pid, LifecycleSignal};
pub use sink::{EventSink, LifecycleEvent, MemorySink, TracingSink, Transition, LIFECYCLE_TARGET};
pub use state::{LoopState, Phase};
pub use unit::ManagedUnit;
