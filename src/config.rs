//! Warden configuration file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use warden_lifecycle::LifecycleConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct WardenConfig {
    #[serde(default)]
    pub lifecycle: LifecycleConfig,

    #[serde(default)]
    pub heartbeat: HeartbeatConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Heartbeat unit settings. Re-read on every reload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct HeartbeatConfig {
    /// Seconds between beats.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Text logged on each beat.
    #[serde(default = "default_message")]
    pub message: String,
}

fn default_interval() -> u64 {
    5
}

fn default_message() -> String {
    "still here".to_string()
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            message: default_message(),
        }
    }
}

impl HeartbeatConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,

    /// Directory for daily-rolling log files. Console only when unset.
    #[serde(default)]
    pub file_dir: Option<PathBuf>,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            file_dir: None,
        }
    }
}

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl WardenConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.lifecycle
            .validate()
            .map_err(|message| ConfigError::InvalidValue {
                field: "lifecycle".to_string(),
                message,
            })?;

        if self.heartbeat.interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "heartbeat.interval_secs".to_string(),
                message: "must be > 0".to_string(),
            });
        }

        if !LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "logging.level".to_string(),
                message: format!("expected one of {}", LEVELS.join(", ")),
            });
        }

        Ok(())
    }
}

/// Loads [`WardenConfig`] from TOML.
pub(crate) struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<WardenConfig, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Load and validate configuration from a string.
    pub fn load_str(content: &str) -> Result<WardenConfig, ConfigError> {
        let config: WardenConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`load`](Self::load), but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<WardenConfig, ConfigError> {
        match fs::read_to_string(path) {
            Ok(content) => Self::load_str(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(WardenConfig::default()),
            Err(e) => Err(e.into()),
        }
    }
}

/// `~/.warden/warden.toml`, or `./warden.toml` without a home directory.
pub(crate) fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".warden").join("warden.toml"))
        .unwrap_or_else(|| PathBuf::from("warden.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_empty_config() {
        let config = ConfigLoader::load_str("").unwrap();
        assert_eq!(config, WardenConfig::default());
        assert_eq!(config.heartbeat.interval(), Duration::from_secs(5));
        assert!(config.lifecycle.handle_os_signals);
    }

    #[test]
    fn test_load_full_config() {
        let content = r#"
            [lifecycle]
            handle_os_signals = false
            slow_transition_secs = 10

            [heartbeat]
            interval_secs = 2
            message = "tick"

            [logging]
            level = "debug"
            file_dir = "/var/log/warden"
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert!(!config.lifecycle.handle_os_signals);
        assert_eq!(config.lifecycle.slow_transition_secs, 10);
        assert_eq!(config.heartbeat.interval_secs, 2);
        assert_eq!(config.heartbeat.message, "tick");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(
            config.logging.file_dir,
            Some(PathBuf::from("/var/log/warden"))
        );
    }

    #[test]
    fn test_zero_interval_rejected() {
        let err = ConfigLoader::load_str("[heartbeat]\ninterval_secs = 0\n").unwrap_err();
        assert!(err.to_string().contains("heartbeat.interval_secs"));
    }

    #[test]
    fn test_invalid_lifecycle_rejected() {
        let err = ConfigLoader::load_str("[lifecycle]\nslow_transition_secs = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_unknown_level_rejected() {
        let err = ConfigLoader::load_str("[logging]\nlevel = \"loud\"\n").unwrap_err();
        assert!(err.to_string().contains("logging.level"));
    }

    #[test]
    fn test_malformed_toml() {
        let err = ConfigLoader::load_str("[heartbeat\n").unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[heartbeat]\ninterval_secs = 7").unwrap();

        let config = ConfigLoader::load(file.path()).unwrap();
        assert_eq!(config.heartbeat.interval_secs, 7);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigLoader::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, WardenConfig::default());
    }

    #[test]
    fn test_load_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigLoader::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_default_config_path() {
        let path = default_config_path();
        assert!(path.ends_with("warden.toml"));
    }
}
