//! Host Audio Capability
//!
//! The engine never renders samples itself. It configures a host-provided
//! real-time context made of composable unit nodes (gain, filter, delay,
//! compressor, analyser, buffer source) that can be connected, disconnected
//! and automated against the host clock.
//!
//! Two asynchronous operations exist: `suspend` and `resume` are requests
//! whose completion arrives later as a [`HostEvent`], together with the
//! natural end of a buffer source. The engine drains these with
//! [`AudioHost::poll_events`] on its control thread.

pub mod simulated;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::dsp::FilterKind;
use crate::engine::AudioBuffer;
use crate::error::Result;

pub use simulated::{SimulatedBackend, SimulatedHost};

/// Opaque handle to a node owned by the host context
pub type NodeId = u32;

/// Kind of unit node the host can create
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeKind {
    /// Linear gain stage
    Gain,
    /// Biquad filter of the given response
    Filter(FilterKind),
    /// Dynamics compressor
    Compressor,
    /// Delay line able to hold up to `max_delay_secs` of audio
    Delay { max_delay_secs: f32 },
    /// Pass-through analysis tap
    Analyser,
    /// One-shot buffer source
    Source,
    /// The hardware output
    Destination,
}

impl NodeKind {
    /// Automatable parameters exposed by this node kind
    pub fn params(&self) -> &'static [AudioParam] {
        match self {
            NodeKind::Gain => &[AudioParam::Gain],
            NodeKind::Filter(_) => &[AudioParam::Frequency, AudioParam::Q, AudioParam::FilterGain],
            NodeKind::Compressor => &[
                AudioParam::Threshold,
                AudioParam::Ratio,
                AudioParam::Attack,
                AudioParam::Release,
            ],
            NodeKind::Delay { .. } => &[AudioParam::DelayTime],
            NodeKind::Analyser | NodeKind::Source | NodeKind::Destination => &[],
        }
    }
}

/// Automatable node parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioParam {
    /// Linear gain of a gain node
    Gain,
    /// Filter center/corner frequency in Hz
    Frequency,
    /// Filter quality factor
    Q,
    /// Filter boost/cut in dB
    FilterGain,
    /// Compressor threshold in dB
    Threshold,
    /// Compressor ratio
    Ratio,
    /// Compressor attack in seconds
    Attack,
    /// Compressor release in seconds
    Release,
    /// Delay time in seconds
    DelayTime,
}

impl AudioParam {
    /// Value a freshly created node reports before any automation
    pub fn default_value(&self) -> f32 {
        match self {
            AudioParam::Gain => 1.0,
            AudioParam::Frequency => 350.0,
            AudioParam::Q => 1.0,
            AudioParam::FilterGain => 0.0,
            AudioParam::Threshold => -24.0,
            AudioParam::Ratio => 12.0,
            AudioParam::Attack => 0.003,
            AudioParam::Release => 0.25,
            AudioParam::DelayTime => 0.0,
        }
    }
}

impl fmt::Display for AudioParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AudioParam::Gain => "gain",
            AudioParam::Frequency => "frequency",
            AudioParam::Q => "q",
            AudioParam::FilterGain => "filter_gain",
            AudioParam::Threshold => "threshold",
            AudioParam::Ratio => "ratio",
            AudioParam::Attack => "attack",
            AudioParam::Release => "release",
            AudioParam::DelayTime => "delay_time",
        };
        write!(f, "{}", name)
    }
}

/// Completion and lifecycle notifications raised by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    /// A previously requested `suspend` has taken effect; the clock is frozen
    Suspended,
    /// A previously requested `resume` has taken effect; the clock runs again
    Resumed,
    /// A buffer source stopped producing audio, either because its buffer
    /// was fully consumed or because it was stopped
    SourceEnded(NodeId),
}

/// A live real-time processing context
pub trait AudioHost {
    /// Create a processing node
    fn create_node(&mut self, kind: NodeKind) -> Result<NodeId>;

    /// Create a one-shot source bound to a decoded buffer
    fn create_source(&mut self, buffer: Arc<AudioBuffer>) -> Result<NodeId>;

    /// The output node every audible path ends in
    fn destination(&self) -> NodeId;

    /// Connect `from`'s output to `to`'s input
    fn connect(&mut self, from: NodeId, to: NodeId) -> Result<()>;

    /// Remove the `from -> to` connection
    ///
    /// Hosts may report an error when the connection does not exist.
    fn disconnect(&mut self, from: NodeId, to: NodeId) -> Result<()>;

    /// Drop a node the engine no longer uses
    fn release(&mut self, node: NodeId) -> Result<()>;

    /// Jump `param` to `value` at `time` on the host clock
    fn set_value_at_time(
        &mut self,
        node: NodeId,
        param: AudioParam,
        value: f32,
        time: f64,
    ) -> Result<()>;

    /// Ramp linearly from the previous scheduled value to `value`, arriving at `end_time`
    fn linear_ramp_to_value_at_time(
        &mut self,
        node: NodeId,
        param: AudioParam,
        value: f32,
        end_time: f64,
    ) -> Result<()>;

    /// Drop every scheduled change at or after `from_time`
    fn cancel_scheduled_values(&mut self, node: NodeId, param: AudioParam, from_time: f64)
        -> Result<()>;

    /// Current effective value of `param`
    fn param_value(&self, node: NodeId, param: AudioParam) -> Result<f32>;

    /// Start a source at `when` on the host clock
    fn start_source(&mut self, source: NodeId, when: f64) -> Result<()>;

    /// Halt a source; takes effect by the next rendering quantum
    fn stop_source(&mut self, source: NodeId) -> Result<()>;

    /// Host clock in seconds
    fn current_time(&self) -> f64;

    /// Request the clock to freeze; completion is reported as [`HostEvent::Suspended`]
    fn suspend(&mut self) -> Result<()>;

    /// Request the clock to run; completion is reported as [`HostEvent::Resumed`]
    fn resume(&mut self) -> Result<()>;

    /// Tear down the context and every node in it
    fn close(&mut self) -> Result<()>;

    /// Drain pending notifications
    fn poll_events(&mut self) -> Vec<HostEvent>;
}

/// Platform entry point that opens a real-time context
///
/// Platforms commonly require this to run inside a user gesture handler.
pub trait HostBackend {
    type Host: AudioHost;

    /// Open a new context, or fail with [`crate::RackError::HostUnavailable`]
    fn open(&mut self) -> Result<Self::Host>;
}
