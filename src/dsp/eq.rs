//! Three-band EQ (low shelf, mid peak, high shelf)
//!
//! Each band maps onto one host biquad filter node. The set of bands and
//! their kinds is fixed; only the numeric fields and the enabled flag change.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::params::ParamRange;

/// Number of EQ bands in the chain
pub const EQ_BAND_COUNT: usize = 3;

/// Filter response of each band, in chain order
pub const BAND_KINDS: [FilterKind; EQ_BAND_COUNT] =
    [FilterKind::LowShelf, FilterKind::Peaking, FilterKind::HighShelf];

/// Center/corner frequency range in Hz
pub const FREQUENCY_RANGE: ParamRange = ParamRange::new(20.0, 20000.0);

/// Boost/cut range in dB
pub const GAIN_DB_RANGE: ParamRange = ParamRange::new(-24.0, 24.0);

/// Quality factor range
pub const Q_RANGE: ParamRange = ParamRange::new(0.1, 10.0);

/// Filter response of an EQ band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    /// Boost/cut below frequency
    LowShelf,
    /// Bell curve boost/cut
    Peaking,
    /// Boost/cut above frequency
    HighShelf,
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterKind::LowShelf => write!(f, "low-shelf"),
            FilterKind::Peaking => write!(f, "peaking"),
            FilterKind::HighShelf => write!(f, "high-shelf"),
        }
    }
}

/// A single EQ band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EqBand {
    /// Filter response (fixed per band position)
    pub kind: FilterKind,
    /// Center/corner frequency in Hz (20-20000)
    pub frequency_hz: f32,
    /// Boost/cut in dB (-24 to +24)
    pub gain_db: f32,
    /// Quality factor (0.1-10)
    pub q: f32,
    /// Whether the band is in the signal path
    pub enabled: bool,
}

impl EqBand {
    /// Create a flat, enabled band
    pub fn new(kind: FilterKind, frequency_hz: f32) -> Self {
        Self {
            kind,
            frequency_hz: FREQUENCY_RANGE.clamp(frequency_hz),
            gain_db: 0.0,
            q: 1.0,
            enabled: true,
        }
    }

    /// The startup bands: low shelf at 320 Hz, mid peak at 1 kHz, high shelf at 3.2 kHz
    pub fn default_bands() -> [EqBand; EQ_BAND_COUNT] {
        [
            EqBand::new(FilterKind::LowShelf, 320.0),
            EqBand::new(FilterKind::Peaking, 1000.0),
            EqBand::new(FilterKind::HighShelf, 3200.0),
        ]
    }

    /// Clamp parameters to valid ranges
    pub fn clamp(&mut self) {
        self.frequency_hz = FREQUENCY_RANGE.clamp(self.frequency_hz);
        self.gain_db = GAIN_DB_RANGE.clamp(self.gain_db);
        self.q = Q_RANGE.clamp(self.q);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bands_follow_kind_order() {
        let bands = EqBand::default_bands();
        for (band, kind) in bands.iter().zip(BAND_KINDS) {
            assert_eq!(band.kind, kind);
            assert!(band.enabled);
            assert_eq!(band.gain_db, 0.0);
        }
        assert!(bands[0].frequency_hz < bands[1].frequency_hz);
        assert!(bands[1].frequency_hz < bands[2].frequency_hz);
    }

    #[test]
    fn test_band_clamping() {
        let mut band = EqBand {
            kind: FilterKind::Peaking,
            frequency_hz: 50000.0,
            gain_db: -60.0,
            q: 0.0,
            enabled: true,
        };

        band.clamp();

        assert_eq!(band.frequency_hz, 20000.0);
        assert_eq!(band.gain_db, -24.0);
        assert_eq!(band.q, 0.1);
    }

    #[test]
    fn test_filter_kind_serde_names() {
        let json = serde_json::to_string(&FilterKind::LowShelf).unwrap();
        assert_eq!(json, "\"low_shelf\"");
        assert_eq!(FilterKind::HighShelf.to_string(), "high-shelf");
    }
}
