//! Engine configuration
//!
//! Loaded from JSON by embedders, or built with `Default`. Every field is
//! optional in the JSON form.

use serde::{Deserialize, Serialize};

use crate::dsp::ParameterModel;
use crate::error::{RackError, Result};

/// Length of every parameter ramp, in seconds
pub const DEFAULT_RAMP_SECS: f64 = 0.010;

/// Engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Transition window for live parameter changes
    pub ramp_secs: f64,
    /// Parameter Model the engine starts with
    pub initial_parameters: ParameterModel,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ramp_secs: DEFAULT_RAMP_SECS,
            initial_parameters: ParameterModel::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON configuration
    ///
    /// # Example
    /// ```
    /// use rackplay::EngineConfig;
    /// let config = EngineConfig::from_json(r#"{"ramp_secs": 0.02}"#).unwrap();
    /// assert_eq!(config.ramp_secs, 0.02);
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()
    }

    /// Reject unusable settings and clamp the initial parameters into range
    pub fn validate(mut self) -> Result<Self> {
        if !self.ramp_secs.is_finite() || self.ramp_secs <= 0.0 {
            return Err(RackError::Config {
                reason: format!("ramp_secs must be a positive number, got {}", self.ramp_secs),
            });
        }
        if self.initial_parameters.has_nan() {
            return Err(RackError::Config {
                reason: "initial_parameters contains NaN".to_string(),
            });
        }
        self.initial_parameters.clamp();
        Ok(self)
    }
}
