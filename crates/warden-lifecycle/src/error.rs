//! Lifecycle errors.

use thiserror::Error;

/// Errors that can occur while constructing or running a [`Coordinator`].
///
/// Failures raised by the managed unit itself are never represented here:
/// the coordinator does not intercept them.
///
/// [`Coordinator`]: crate::Coordinator
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// No managed unit was supplied to the builder.
    #[error("Coordinator requires a managed unit")]
    MissingUnit,

    /// No event sink was supplied to the builder.
    #[error("Coordinator requires an event sink")]
    MissingSink,

    /// Configuration failed validation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failed to register OS signal handlers.
    #[error("Failed to set up signal handlers: {0}")]
    SignalSetup(String),

    /// Failed to deliver a signal to another process.
    #[error("Failed to send signal to PID {pid}: {reason}")]
    SignalDelivery { pid: u32, reason: String },

    /// `begin()` was called on a coordinator whose run already finished.
    #[error("Coordinator has already completed its run")]
    AlreadyCompleted,

    /// The run loop task terminated abnormally.
    #[error("Run loop error: {0}")]
    RunLoop(String),
}

/// Result type for lifecycle operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_collaborator_errors() {
        assert!(LifecycleError::MissingUnit.to_string().contains("managed unit"));
        assert!(LifecycleError::MissingSink.to_string().contains("event sink"));
    }

    #[test]
    fn test_config_error() {
        let err = LifecycleError::Config("slow_transition_secs must be > 0".to_string());
        let msg = err.to_string();
        assert!(msg.starts_with("Configuration error"));
        assert!(msg.contains("slow_transition_secs"));
    }

    #[test]
    fn test_signal_setup_error() {
        let err = LifecycleError::SignalSetup("permission denied".to_string());
        assert!(err.to_string().contains("permission denied"));
    }

    #[test]
    fn test_signal_delivery_error() {
        let err = LifecycleError::SignalDelivery {
            pid: 4242,
            reason: "ESRCH: No such process".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("4242"));
        assert!(msg.contains("No such process"));
    }

    #[test]
    fn test_already_completed() {
        assert!(LifecycleError::AlreadyCompleted
            .to_string()
            .contains("already completed"));
    }
}
