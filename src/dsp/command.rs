//! Parameter commands
//!
//! An edit from the control surface is a [`ParamCommand`]. [`reduce`] turns
//! the current model plus one command into the next model and a list of
//! declarative [`SideEffect`]s. It touches no nodes: the engine executes
//! the side effects afterwards.
//!
//! Numeric values are clamped into their range rather than rejected.
//! NaN is refused outright so it can never reach a live node.

use std::fmt;

use super::compressor::{ATTACK_SECS_RANGE, RATIO_RANGE, RELEASE_SECS_RANGE, THRESHOLD_DB_RANGE};
use super::delay::{FEEDBACK_RANGE, MIX_RANGE, TIME_SECS_RANGE};
use super::eq::{EqBand, EQ_BAND_COUNT, FREQUENCY_RANGE, GAIN_DB_RANGE, Q_RANGE};
use super::params::{ParamRange, ParameterModel, MASTER_GAIN_RANGE};
use crate::engine::NodeRole;
use crate::error::{RackError, Result};
use crate::host::AudioParam;

/// Which effect an edit addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamTarget {
    /// EQ band by position (0 = low shelf, 1 = mid peak, 2 = high shelf)
    EqBand(usize),
    Compressor,
    Delay,
    /// Master volume
    Master,
}

impl fmt::Display for ParamTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamTarget::EqBand(i) => write!(f, "eq[{}]", i),
            ParamTarget::Compressor => write!(f, "compressor"),
            ParamTarget::Delay => write!(f, "delay"),
            ParamTarget::Master => write!(f, "master"),
        }
    }
}

/// Which field of the target an edit changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamField {
    /// Bypass toggle (EQ bands, compressor, delay)
    Enabled,
    /// EQ frequency in Hz
    Frequency,
    /// EQ boost/cut in dB
    Gain,
    /// EQ quality factor
    Q,
    /// Compressor threshold in dB
    Threshold,
    /// Compressor ratio
    Ratio,
    /// Compressor attack in seconds
    Attack,
    /// Compressor release in seconds
    Release,
    /// Delay time in seconds
    Time,
    /// Delay feedback amount
    Feedback,
    /// Delay wet/dry blend
    Mix,
    /// Master volume
    Volume,
}

impl fmt::Display for ParamField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamField::Enabled => "enabled",
            ParamField::Frequency => "frequency",
            ParamField::Gain => "gain",
            ParamField::Q => "q",
            ParamField::Threshold => "threshold",
            ParamField::Ratio => "ratio",
            ParamField::Attack => "attack",
            ParamField::Release => "release",
            ParamField::Time => "time",
            ParamField::Feedback => "feedback",
            ParamField::Mix => "mix",
            ParamField::Volume => "volume",
        };
        write!(f, "{}", name)
    }
}

/// New value carried by an edit
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Toggle(bool),
    Number(f32),
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Toggle(value)
    }
}

impl From<f32> for ParamValue {
    fn from(value: f32) -> Self {
        ParamValue::Number(value)
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Toggle(v) => write!(f, "{}", v),
            ParamValue::Number(v) => write!(f, "{}", v),
        }
    }
}

/// A single edit: set `field` of `target` to `value`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamCommand {
    pub target: ParamTarget,
    pub field: ParamField,
    pub value: ParamValue,
}

impl ParamCommand {
    pub fn new(target: ParamTarget, field: ParamField, value: impl Into<ParamValue>) -> Self {
        Self {
            target,
            field,
            value: value.into(),
        }
    }

    fn name(&self) -> String {
        format!("{}.{}", self.target, self.field)
    }

    fn unknown(&self) -> RackError {
        RackError::UnknownParameter {
            target: self.target.to_string(),
            field: self.field.to_string(),
        }
    }

    fn toggle(&self) -> Result<bool> {
        match self.value {
            ParamValue::Toggle(v) => Ok(v),
            ParamValue::Number(_) => Err(RackError::InvalidParameterValue {
                param: self.name(),
                value: self.value.to_string(),
                expected: "true or false".to_string(),
            }),
        }
    }

    fn number(&self, range: ParamRange) -> Result<f32> {
        match self.value {
            ParamValue::Number(v) if !v.is_nan() => Ok(range.clamp(v)),
            _ => Err(RackError::InvalidParameterValue {
                param: self.name(),
                value: self.value.to_string(),
                expected: format!("a number ({})", range),
            }),
        }
    }
}

/// Declarative work the engine performs after a model update
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SideEffect {
    /// Smoothly move a live node parameter to `value`
    Ramp {
        role: NodeRole,
        param: AudioParam,
        value: f32,
    },
    /// Rebuild the connection topology from the enabled flags
    Reconcile,
}

/// Result of reducing one command
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    /// The model that replaces the current one
    pub model: ParameterModel,
    /// Work to apply to the live graph, in order
    pub effects: Vec<SideEffect>,
}

/// Apply `command` to `model`
///
/// # Errors
/// * `InvalidBand` - If an EQ band index is out of range
/// * `UnknownParameter` - If the target has no such field
/// * `InvalidParameterValue` - If the value has the wrong type or is NaN
///
/// # Example
/// ```
/// use rackplay::dsp::{reduce, ParamCommand, ParamField, ParamTarget, ParameterModel, MAX_FEEDBACK};
///
/// let model = ParameterModel::default();
/// let cmd = ParamCommand::new(ParamTarget::Delay, ParamField::Feedback, 4.0_f32);
/// let update = reduce(&model, &cmd).unwrap();
/// assert_eq!(update.model.delay.feedback, MAX_FEEDBACK);
/// ```
pub fn reduce(model: &ParameterModel, command: &ParamCommand) -> Result<Update> {
    let mut next = model.clone();

    if let ParamTarget::EqBand(index) = command.target {
        if index >= EQ_BAND_COUNT {
            return Err(RackError::InvalidBand {
                index,
                count: EQ_BAND_COUNT,
            });
        }
    }

    if command.field == ParamField::Enabled {
        let enabled = command.toggle()?;
        match command.target {
            ParamTarget::EqBand(i) => next.eq[i].enabled = enabled,
            ParamTarget::Compressor => next.compressor.enabled = enabled,
            ParamTarget::Delay => next.delay.enabled = enabled,
            ParamTarget::Master => return Err(command.unknown()),
        }
        return Ok(Update {
            model: next,
            effects: vec![SideEffect::Reconcile],
        });
    }

    let effects = match command.target {
        ParamTarget::EqBand(i) => reduce_band(&mut next.eq[i], i, command)?,
        ParamTarget::Compressor => {
            let c = &mut next.compressor;
            let (slot, range, param) = match command.field {
                ParamField::Threshold => (&mut c.threshold_db, THRESHOLD_DB_RANGE, AudioParam::Threshold),
                ParamField::Ratio => (&mut c.ratio, RATIO_RANGE, AudioParam::Ratio),
                ParamField::Attack => (&mut c.attack_secs, ATTACK_SECS_RANGE, AudioParam::Attack),
                ParamField::Release => (&mut c.release_secs, RELEASE_SECS_RANGE, AudioParam::Release),
                _ => return Err(command.unknown()),
            };
            *slot = command.number(range)?;
            vec![ramp(NodeRole::Compressor, param, *slot)]
        }
        ParamTarget::Delay => {
            let d = &mut next.delay;
            match command.field {
                ParamField::Time => {
                    d.time_secs = command.number(TIME_SECS_RANGE)?;
                    vec![ramp(NodeRole::DelayLine, AudioParam::DelayTime, d.time_secs)]
                }
                ParamField::Feedback => {
                    d.feedback = command.number(FEEDBACK_RANGE)?;
                    vec![ramp(NodeRole::Feedback, AudioParam::Gain, d.feedback)]
                }
                // Dry and wet move together so the blend never lurches
                ParamField::Mix => {
                    d.mix = command.number(MIX_RANGE)?;
                    vec![
                        ramp(NodeRole::Dry, AudioParam::Gain, d.dry_gain()),
                        ramp(NodeRole::Wet, AudioParam::Gain, d.wet_gain()),
                    ]
                }
                _ => return Err(command.unknown()),
            }
        }
        ParamTarget::Master => match command.field {
            ParamField::Volume => {
                next.master_gain = command.number(MASTER_GAIN_RANGE)?;
                vec![ramp(NodeRole::Master, AudioParam::Gain, next.master_gain)]
            }
            _ => return Err(command.unknown()),
        },
    };

    Ok(Update {
        model: next,
        effects,
    })
}

fn reduce_band(band: &mut EqBand, index: usize, command: &ParamCommand) -> Result<Vec<SideEffect>> {
    let role = NodeRole::EqBand(index);
    let effect = match command.field {
        ParamField::Frequency => {
            band.frequency_hz = command.number(FREQUENCY_RANGE)?;
            ramp(role, AudioParam::Frequency, band.frequency_hz)
        }
        ParamField::Gain => {
            band.gain_db = command.number(GAIN_DB_RANGE)?;
            ramp(role, AudioParam::FilterGain, band.gain_db)
        }
        ParamField::Q => {
            band.q = command.number(Q_RANGE)?;
            ramp(role, AudioParam::Q, band.q)
        }
        _ => return Err(command.unknown()),
    };
    Ok(vec![effect])
}

#[inline]
fn ramp(role: NodeRole, param: AudioParam, value: f32) -> SideEffect {
    SideEffect::Ramp { role, param, value }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::delay::MAX_FEEDBACK;
    use test_case::test_case;

    fn apply(target: ParamTarget, field: ParamField, value: impl Into<ParamValue>) -> Result<Update> {
        reduce(&ParameterModel::default(), &ParamCommand::new(target, field, value))
    }

    #[test]
    fn test_enable_flag_requests_reconcile() {
        let update = apply(ParamTarget::Compressor, ParamField::Enabled, false).unwrap();
        assert!(!update.model.compressor.enabled);
        assert_eq!(update.effects, vec![SideEffect::Reconcile]);
    }

    #[test]
    fn test_reduce_leaves_input_untouched() {
        let model = ParameterModel::default();
        let cmd = ParamCommand::new(ParamTarget::EqBand(1), ParamField::Gain, 6.0_f32);

        let update = reduce(&model, &cmd).unwrap();

        assert_eq!(model, ParameterModel::default());
        assert_eq!(update.model.eq[1].gain_db, 6.0);
    }

    #[test]
    fn test_numeric_edit_ramps_node() {
        let update = apply(ParamTarget::EqBand(2), ParamField::Frequency, 5000.0_f32).unwrap();
        assert_eq!(
            update.effects,
            vec![SideEffect::Ramp {
                role: NodeRole::EqBand(2),
                param: AudioParam::Frequency,
                value: 5000.0,
            }]
        );
    }

    #[test_case(1.0 ; "unity")]
    #[test_case(7.5 ; "far above")]
    #[test_case(-3.0 ; "negative")]
    #[test_case(f32::INFINITY ; "infinite")]
    #[test_case(f32::NEG_INFINITY ; "negative infinite")]
    fn test_feedback_always_below_unity(value: f32) {
        let update = apply(ParamTarget::Delay, ParamField::Feedback, value).unwrap();
        assert!(update.model.delay.feedback < 1.0);
        assert!(update.model.delay.feedback >= 0.0);
        assert!(update.model.delay.feedback <= MAX_FEEDBACK);
    }

    #[test]
    fn test_mix_drives_dry_and_wet() {
        let update = apply(ParamTarget::Delay, ParamField::Mix, 0.8_f32).unwrap();
        assert_eq!(update.effects.len(), 2);
        assert!(update.effects.contains(&SideEffect::Ramp {
            role: NodeRole::Wet,
            param: AudioParam::Gain,
            value: 0.8,
        }));
        let dry = update.effects.iter().find_map(|e| match e {
            SideEffect::Ramp {
                role: NodeRole::Dry,
                value,
                ..
            } => Some(*value),
            _ => None,
        });
        assert!((dry.unwrap() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        let update = apply(ParamTarget::Compressor, ParamField::Ratio, 100.0_f32).unwrap();
        assert_eq!(update.model.compressor.ratio, 20.0);

        let update = apply(ParamTarget::Master, ParamField::Volume, -2.0_f32).unwrap();
        assert_eq!(update.model.master_gain, 0.0);
    }

    #[test]
    fn test_nan_rejected() {
        let err = apply(ParamTarget::Delay, ParamField::Time, f32::NAN).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_PARAMETER_VALUE");
    }

    #[test]
    fn test_wrong_value_type_rejected() {
        assert!(apply(ParamTarget::Delay, ParamField::Enabled, 1.0_f32).is_err());
        assert!(apply(ParamTarget::Delay, ParamField::Mix, true).is_err());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = apply(ParamTarget::Compressor, ParamField::Mix, 0.5_f32).unwrap_err();
        assert!(matches!(err, RackError::UnknownParameter { .. }));

        let err = apply(ParamTarget::Master, ParamField::Enabled, false).unwrap_err();
        assert!(matches!(err, RackError::UnknownParameter { .. }));
    }

    #[test]
    fn test_band_out_of_range() {
        let err = apply(ParamTarget::EqBand(3), ParamField::Enabled, false).unwrap_err();
        assert!(matches!(err, RackError::InvalidBand { index: 3, count: 3 }));
    }

    #[test]
    fn test_display_names() {
        let cmd = ParamCommand::new(ParamTarget::EqBand(0), ParamField::Q, 2.0_f32);
        assert_eq!(cmd.name(), "eq[0].q");
    }
}
