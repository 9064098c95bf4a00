//! Parameter Model
//!
//! The user-editable state of every effect. Pure data: it knows nothing
//! about nodes or connections. Edits never mutate a model in place; the
//! reducer in [`super::command`] produces a new model that replaces the
//! old one as a whole.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::compressor::CompressorConfig;
use super::delay::DelayConfig;
use super::eq::{EqBand, BAND_KINDS, EQ_BAND_COUNT};
use crate::engine::NodeRole;
use crate::host::AudioParam;

/// Master volume range (linear gain)
pub const MASTER_GAIN_RANGE: ParamRange = ParamRange::new(0.0, 2.0);

/// Inclusive range a numeric parameter is clamped into
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRange {
    pub min: f32,
    pub max: f32,
}

impl ParamRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Clamp into the range; infinities land on the bounds
    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }

    #[inline]
    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }
}

impl fmt::Display for ParamRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.min, self.max)
    }
}

/// Complete effect state: three EQ bands, compressor, delay and master volume
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterModel {
    /// Low shelf, mid peak, high shelf (fixed order and kinds)
    pub eq: [EqBand; EQ_BAND_COUNT],
    pub compressor: CompressorConfig,
    pub delay: DelayConfig,
    /// Master volume (linear gain)
    pub master_gain: f32,
}

impl Default for ParameterModel {
    fn default() -> Self {
        Self {
            eq: EqBand::default_bands(),
            compressor: CompressorConfig::default(),
            delay: DelayConfig::default(),
            master_gain: 1.0,
        }
    }
}

impl ParameterModel {
    /// Clamp every field into range and restore the fixed band kinds
    pub fn clamp(&mut self) {
        for (band, kind) in self.eq.iter_mut().zip(BAND_KINDS) {
            band.kind = kind;
            band.clamp();
        }
        self.compressor.clamp();
        self.delay.clamp();
        self.master_gain = MASTER_GAIN_RANGE.clamp(self.master_gain);
    }

    /// Check whether any numeric field is NaN
    pub fn has_nan(&self) -> bool {
        let eq = self
            .eq
            .iter()
            .any(|b| b.frequency_hz.is_nan() || b.gain_db.is_nan() || b.q.is_nan());
        let c = &self.compressor;
        let d = &self.delay;
        eq || c.threshold_db.is_nan()
            || c.ratio.is_nan()
            || c.attack_secs.is_nan()
            || c.release_secs.is_nan()
            || d.time_secs.is_nan()
            || d.feedback.is_nan()
            || d.mix.is_nan()
            || self.master_gain.is_nan()
    }

    /// Live node value implied by every field of the model
    ///
    /// Used to initialise freshly created nodes.
    pub fn node_values(&self) -> Vec<(NodeRole, AudioParam, f32)> {
        let mut values = Vec::with_capacity(EQ_BAND_COUNT * 3 + 9);

        values.push((NodeRole::Master, AudioParam::Gain, self.master_gain));

        for (i, band) in self.eq.iter().enumerate() {
            values.push((NodeRole::EqBand(i), AudioParam::Frequency, band.frequency_hz));
            values.push((NodeRole::EqBand(i), AudioParam::FilterGain, band.gain_db));
            values.push((NodeRole::EqBand(i), AudioParam::Q, band.q));
        }

        let c = &self.compressor;
        values.push((NodeRole::Compressor, AudioParam::Threshold, c.threshold_db));
        values.push((NodeRole::Compressor, AudioParam::Ratio, c.ratio));
        values.push((NodeRole::Compressor, AudioParam::Attack, c.attack_secs));
        values.push((NodeRole::Compressor, AudioParam::Release, c.release_secs));

        let d = &self.delay;
        values.push((NodeRole::DelayLine, AudioParam::DelayTime, d.time_secs));
        values.push((NodeRole::Feedback, AudioParam::Gain, d.feedback));
        values.push((NodeRole::Dry, AudioParam::Gain, d.dry_gain()));
        values.push((NodeRole::Wet, AudioParam::Gain, d.wet_gain()));

        values
    }
}
