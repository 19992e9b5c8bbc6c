//! Engine configuration loaded from TOML.

use std::path::Path;

use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::presentation::MessageLimits;

/// How simultaneous optional triggers are offered to players.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OptionalTriggerPolicy {
    /// Every optional trigger on the event is offered in one prompt.
    #[default]
    Simultaneous,
    /// Only the first optional trigger (in resolution order) is offered.
    OneAtATime,
}

/// Runtime configuration for the engine and its binary.
#[derive(Debug, Clone, Getters, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    db_path: String,

    /// Upper bound on resolution steps in a single drain.
    #[serde(default = "default_max_resolution_steps")]
    max_resolution_steps: usize,

    /// How optional triggers are presented.
    #[serde(default)]
    optional_triggers: OptionalTriggerPolicy,

    /// Delay before an idle decision is re-surfaced.
    #[serde(default = "default_nudge_delay_secs")]
    nudge_delay_secs: u64,

    /// Per-message capacity of the presentation sink.
    #[serde(default)]
    message_limits: MessageLimits,
}

#[instrument]
fn default_db_path() -> String {
    "orbital_conquest.db".to_string()
}

#[instrument]
fn default_max_resolution_steps() -> usize {
    1000
}

#[instrument]
fn default_nudge_delay_secs() -> u64 {
    3600
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            max_resolution_steps: default_max_resolution_steps(),
            optional_triggers: OptionalTriggerPolicy::default(),
            nudge_delay_secs: default_nudge_delay_secs(),
            message_limits: MessageLimits::default(),
        }
    }
}

impl EngineConfig {
    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading engine config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;
        let config = Self::from_toml(&content)?;
        info!(db_path = %config.db_path, "Config loaded successfully");
        Ok(config)
    }

    /// Parses configuration from a TOML string.
    #[instrument(skip(content))]
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;
        if config.max_resolution_steps == 0 {
            return Err(ConfigError::new("max_resolution_steps must be positive"));
        }
        Ok(config)
    }

    /// Returns a copy with a different database path.
    pub fn with_db_path(mut self, db_path: impl Into<String>) -> Self {
        self.db_path = db_path.into();
        self
    }

    /// Returns a copy with a different optional-trigger policy.
    pub fn with_optional_triggers(mut self, policy: OptionalTriggerPolicy) -> Self {
        self.optional_triggers = policy;
        self
    }

    /// Returns a copy with a different resolution step bound.
    pub fn with_max_resolution_steps(mut self, steps: usize) -> Self {
        self.max_resolution_steps = steps;
        self
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}
