//! Engine configuration.
//!
//! Settings can be built in code or loaded from TOML:
//!
//! ```toml
//! start_time = 0          # microseconds
//! default_step = 1000000  # microseconds
//! trace_visits = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use tempo_model::{SimDuration, SimTime};

use crate::error::{ConfigError, PropagationError};

/// Configuration for a [`crate::PropagationGraph`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Initial value of the shared clock.
    pub start_time: SimTime,

    /// Step length used by `step_default`.
    pub default_step: SimDuration,

    /// Emit a debug record for every node visit.
    pub trace_visits: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            start_time: SimTime::ZERO,
            default_step: SimDuration::from_secs(1),
            trace_visits: false,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Check that the settings are usable.
    pub fn validate(&self) -> Result<(), PropagationError> {
        if !self.default_step.is_positive() {
            return Err(PropagationError::InvalidStepDuration {
                dt: self.default_step,
            });
        }
        Ok(())
    }
}
