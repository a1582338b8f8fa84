//! Coordinator configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Lifecycle coordinator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Whether `begin()` subscribes to SIGTERM/SIGINT/SIGHUP.
    /// Disable for embedding in tests or when the host owns signal handling.
    #[serde(default = "default_handle_os_signals")]
    pub handle_os_signals: bool,

    /// Transitions taking longer than this (in seconds) are reported at warn level.
    #[serde(default = "default_slow_transition")]
    pub slow_transition_secs: u64,
}

fn default_handle_os_signals() -> bool {
    true
}

fn default_slow_transition() -> u64 {
    30
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            handle_os_signals: default_handle_os_signals(),
            slow_transition_secs: default_slow_transition(),
        }
    }
}

impl LifecycleConfig {
    /// Configuration that leaves OS signals alone; events only arrive
    /// through `signal_reload`/`signal_shutdown`.
    pub fn without_os_signals() -> Self {
        Self {
            handle_os_signals: false,
            ..Default::default()
        }
    }

    /// Get the slow transition threshold as a Duration.
    pub fn slow_transition(&self) -> Duration {
        Duration::from_secs(self.slow_transition_secs)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.slow_transition_secs == 0 {
            return Err("slow_transition_secs must be > 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
