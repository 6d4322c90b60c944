use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FinsightError, Result};

/// Top-level finsight configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Workflow coordinator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Hours a terminal workflow stays queryable before cleanup removes it.
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u64,
    /// Seconds between background cleanup sweeps.
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
    /// Upper bound on a single capability call (0 = unbounded).
    #[serde(default)]
    pub step_timeout_secs: u64,
    /// Stop scheduling new rounds once a workflow is cancelled (default: true).
    /// When false, cancellation only flips the status flag.
    #[serde(default = "default_cancel_between_rounds")]
    pub cancel_between_rounds: bool,
    /// Capacity of the coordinator event bus.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            retention_hours: default_retention_hours(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            step_timeout_secs: 0,
            cancel_between_rounds: default_cancel_between_rounds(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl CoordinatorConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_hours.saturating_mul(3600))
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs.max(1))
    }

    pub fn step_timeout(&self) -> Option<Duration> {
        (self.step_timeout_secs > 0).then(|| Duration::from_secs(self.step_timeout_secs))
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_retention_hours() -> u64 { 24 }
fn default_cleanup_interval_secs() -> u64 { 3600 }
fn default_cancel_between_rounds() -> bool { true }
fn default_event_capacity() -> usize { 256 }
fn default_log_filter() -> String { "finsight=info,warn".to_string() }

impl AppConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FinsightError::ConfigNotFound(path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        Self::from_toml(&content)
    }

    /// Parse config from TOML text, expanding `${ENV_VAR}` references first.
    pub fn from_toml(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content);

        toml::from_str(&expanded).map_err(|e| FinsightError::Config(e.to_string()))
    }

    /// Load config if the file exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

/// Expand `${ENV_VAR}` patterns in a string.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_name.push(c);
            }
            match std::env::var(&var_name) {
                Ok(val) => result.push_str(&val),
                Err(_) => {
                    // Keep original if env var not set
                    result.push_str(&format!("${{{}}}", var_name));
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("TEST_FINSIGHT_VAR", "hello");
        let result = expand_env_vars("key = \"${TEST_FINSIGHT_VAR}\"");
        assert_eq!(result, "key = \"hello\"");
        std::env::remove_var("TEST_FINSIGHT_VAR");
    }

    #[test]
    fn test_expand_env_vars_missing() {
        let result = expand_env_vars("key = \"${NONEXISTENT_FINSIGHT_VAR}\"");
        assert_eq!(result, "key = \"${NONEXISTENT_FINSIGHT_VAR}\"");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.coordinator.retention_hours, 24);
        assert_eq!(config.coordinator.cleanup_interval_secs, 3600);
        assert!(config.coordinator.cancel_between_rounds);
        assert!(config.coordinator.step_timeout().is_none());
        assert_eq!(config.log.filter, "finsight=info,warn");
    }

    #[test]
    fn test_durations() {
        let config = CoordinatorConfig {
            retention_hours: 2,
            cleanup_interval_secs: 0,
            step_timeout_secs: 15,
            ..Default::default()
        };
        assert_eq!(config.retention(), Duration::from_secs(7200));
        assert_eq!(config.cleanup_interval(), Duration::from_secs(1));
        assert_eq!(config.step_timeout(), Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = AppConfig::from_toml("[coordinator\nretention_hours = 1").unwrap_err();
        assert!(matches!(err, FinsightError::Config(_)));
    }

    #[test]
    fn test_missing_file_falls_back() {
        let config =
            AppConfig::load_or_default(Path::new("/definitely/not/here/finsight.toml")).unwrap();
        assert_eq!(config.coordinator.retention_hours, 24);
        assert!(matches!(
            AppConfig::load(Path::new("/definitely/not/here/finsight.toml")),
            Err(FinsightError::ConfigNotFound(_))
        ));
    }
}
