//! Configuration for the window statistics engine and its CLI.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// What to do with an event whose window has already been finalized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum LateDataPolicy {
    /// Count the event and discard it.
    #[default]
    Drop,
    /// Hand the event to the late-data subscribers instead of the primary emitters.
    SideOutput,
}

/// Engine settings, fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fixed window length
    #[serde(with = "duration_serde")]
    pub window_size: Duration,

    /// How far the watermark trails the highest event time
    #[serde(with = "duration_serde")]
    pub allowed_lateness: Duration,

    pub late_data_policy: LateDataPolicy,

    /// Upper bound on simultaneously open windows; oldest are finalized early
    pub max_open_windows: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_size: Duration::from_secs(60),
            allowed_lateness: Duration::ZERO,
            late_data_policy: LateDataPolicy::Drop,
            max_open_windows: None,
        }
    }
}

impl EngineConfig {
    pub fn with_window_size(mut self, window_size: Duration) -> Self {
        self.window_size = window_size;
        self
    }

    pub fn with_allowed_lateness(mut self, allowed_lateness: Duration) -> Self {
        self.allowed_lateness = allowed_lateness;
        self
    }

    pub fn with_late_data_policy(mut self, policy: LateDataPolicy) -> Self {
        self.late_data_policy = policy;
        self
    }

    pub fn with_max_open_windows(mut self, max_open_windows: usize) -> Self {
        self.max_open_windows = Some(max_open_windows);
        self
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size.as_millis() == 0 {
            return Err(ConfigError::Invalid(
                "window_size must be at least 1ms".to_string(),
            ));
        }
        if i64::try_from(self.allowed_lateness.as_millis()).is_err() {
            return Err(ConfigError::Invalid(
                "allowed_lateness is too large".to_string(),
            ));
        }
        if self.max_open_windows == Some(0) {
            return Err(ConfigError::Invalid(
                "max_open_windows must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// How finalized windows are written by the CLI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// One human-readable line per window
    #[default]
    Text,
    /// One JSON object per window
    Jsonl,
}

/// Main configuration for the CLI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,

    pub output: OutputFormat,

    /// IANA zone used to render window bounds (UTC when unset)
    pub timezone: Option<String>,
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        let config: Config =
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.engine.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to an explicit file.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("synheart-window-stats")
            .join("config.json")
    }

    /// Resolve the configured timezone.
    pub fn tz(&self) -> Result<Option<chrono_tz::Tz>, ConfigError> {
        self.timezone
            .as_deref()
            .map(|name| {
                name.parse::<chrono_tz::Tz>()
                    .map_err(|_| ConfigError::Invalid(format!("unknown timezone `{name}`")))
            })
            .transpose()
    }
}

/// Serde support for Duration as whole seconds.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
