//! Compressor configuration
//!
//! Settings for the host dynamics-compressor node.

use serde::{Deserialize, Serialize};

use super::params::ParamRange;

/// Threshold level in dB
pub const THRESHOLD_DB_RANGE: ParamRange = ParamRange::new(-100.0, 0.0);

/// Compression ratio (1:1 to 20:1)
pub const RATIO_RANGE: ParamRange = ParamRange::new(1.0, 20.0);

/// Attack time in seconds
pub const ATTACK_SECS_RANGE: ParamRange = ParamRange::new(0.001, 0.2);

/// Release time in seconds
pub const RELEASE_SECS_RANGE: ParamRange = ParamRange::new(0.01, 1.0);

/// Compressor settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressorConfig {
    /// Threshold level in dB (-100 to 0 dB)
    pub threshold_db: f32,
    /// Compression ratio (1.0 to 20.0, representing 1:1 to 20:1)
    pub ratio: f32,
    /// Attack time in seconds (0.001 to 0.2)
    pub attack_secs: f32,
    /// Release time in seconds (0.01 to 1.0)
    pub release_secs: f32,
    /// Whether the compressor is in the signal path
    pub enabled: bool,
}

impl Default for CompressorConfig {
    fn default() -> Self {
        Self {
            threshold_db: -24.0,
            ratio: 4.0,
            attack_secs: 0.003,
            release_secs: 0.25,
            enabled: true,
        }
    }
}

impl CompressorConfig {
    /// Clamp parameters to valid ranges
    pub fn clamp(&mut self) {
        self.threshold_db = THRESHOLD_DB_RANGE.clamp(self.threshold_db);
        self.ratio = RATIO_RANGE.clamp(self.ratio);
        self.attack_secs = ATTACK_SECS_RANGE.clamp(self.attack_secs);
        self.release_secs = RELEASE_SECS_RANGE.clamp(self.release_secs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compressor_default_params() {
        let config = CompressorConfig::default();

        assert_eq!(config.threshold_db, -24.0);
        assert_eq!(config.ratio, 4.0);
        assert_eq!(config.attack_secs, 0.003);
        assert_eq!(config.release_secs, 0.25);
        assert!(config.enabled);
    }

    #[test]
    fn test_parameter_clamping() {
        let mut config = CompressorConfig {
            threshold_db: -150.0,
            ratio: 50.0,
            attack_secs: 0.0,
            release_secs: 5.0,
            enabled: false,
        };

        config.clamp();

        assert_eq!(config.threshold_db, -100.0);
        assert_eq!(config.ratio, 20.0);
        assert_eq!(config.attack_secs, 0.001);
        assert_eq!(config.release_secs, 1.0);
        assert!(!config.enabled);
    }

    #[test]
    fn test_defaults_are_in_range() {
        let config = CompressorConfig::default();
        assert!(THRESHOLD_DB_RANGE.contains(config.threshold_db));
        assert!(RATIO_RANGE.contains(config.ratio));
        assert!(ATTACK_SECS_RANGE.contains(config.attack_secs));
        assert!(RELEASE_SECS_RANGE.contains(config.release_secs));
    }
}
