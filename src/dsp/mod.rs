//! Effect parameters
//!
//! The Parameter Model (EQ, compressor, delay, master volume) and the
//! command reducer that turns control-surface edits into model updates.
//! Nothing here touches the audio host.

mod command;
mod compressor;
mod delay;
mod eq;
mod params;

pub use command::{reduce, ParamCommand, ParamField, ParamTarget, ParamValue, SideEffect, Update};
pub use compressor::{
    CompressorConfig, ATTACK_SECS_RANGE, RATIO_RANGE, RELEASE_SECS_RANGE, THRESHOLD_DB_RANGE,
};
pub use delay::{
    DelayConfig, FEEDBACK_RANGE, MAX_DELAY_SECS, MAX_FEEDBACK, MIX_RANGE, TIME_SECS_RANGE,
};
pub use eq::{
    EqBand, FilterKind, BAND_KINDS, EQ_BAND_COUNT, FREQUENCY_RANGE, GAIN_DB_RANGE, Q_RANGE,
};
pub use params::{ParamRange, ParameterModel, MASTER_GAIN_RANGE};
