//! Feedback delay configuration
//!
//! The delay stage is four host nodes: the delay line, a feedback gain
//! looping the line's output back into its input, and dry/wet gains that
//! are summed into the master gain. `mix` drives dry and wet together.

use serde::{Deserialize, Serialize};

use super::params::ParamRange;

/// Longest delay the delay line can hold, in seconds
pub const MAX_DELAY_SECS: f32 = 5.0;

/// Feedback ceiling; must stay below 1.0 or the loop gain grows without bound
pub const MAX_FEEDBACK: f32 = 0.95;

const _: () = assert!(MAX_FEEDBACK < 1.0);

/// Delay time in seconds
pub const TIME_SECS_RANGE: ParamRange = ParamRange::new(0.0, MAX_DELAY_SECS);

/// Feedback amount
pub const FEEDBACK_RANGE: ParamRange = ParamRange::new(0.0, MAX_FEEDBACK);

/// Wet/dry blend (0 = dry only, 1 = wet only)
pub const MIX_RANGE: ParamRange = ParamRange::new(0.0, 1.0);

/// Delay settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayConfig {
    /// Delay time in seconds (0-5)
    pub time_secs: f32,
    /// Feedback amount (0-0.95, NOT 1.0 to prevent infinite feedback)
    pub feedback: f32,
    /// Wet/dry blend (0-1)
    pub mix: f32,
    /// Whether the delay is in the signal path
    pub enabled: bool,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            time_secs: 0.3,
            feedback: 0.3,
            mix: 0.3,
            enabled: false,
        }
    }
}

impl DelayConfig {
    /// Clamp parameters to valid ranges
    pub fn clamp(&mut self) {
        self.time_secs = TIME_SECS_RANGE.clamp(self.time_secs);
        self.feedback = FEEDBACK_RANGE.clamp(self.feedback);
        self.mix = MIX_RANGE.clamp(self.mix);
    }

    /// Level of the unprocessed path
    #[inline]
    pub fn dry_gain(&self) -> f32 {
        1.0 - self.mix
    }

    /// Level of the delayed path
    #[inline]
    pub fn wet_gain(&self) -> f32 {
        self.mix
    }
}
