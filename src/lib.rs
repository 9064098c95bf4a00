//! Rackplay - Real-time Effects Rack
//!
//! Plays a decoded audio file through a fixed chain of effects
//! (three-band EQ, compressor, feedback delay) on a host-provided
//! real-time processing context, with live parameter edits.
//!
//! # Architecture
//!
//! - `dsp`: the Parameter Model and the pure command reducer
//! - `host`: the capability surface of the real-time context, plus a
//!   deterministic simulated host
//! - `engine`: Node Set, Graph Router, transport and the [`Engine`] itself
//!
//! ```
//! use rackplay::{Engine, ParamField, ParamTarget, SimulatedBackend, TransportState};
//!
//! let mut engine = Engine::new(SimulatedBackend::new());
//! engine.activate().unwrap();
//! engine.set_parameter(ParamTarget::Delay, ParamField::Enabled, true).unwrap();
//! assert_eq!(engine.transport_state(), TransportState::Idle);
//! ```

pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod host;

pub use config::EngineConfig;
pub use dsp::{ParamCommand, ParamField, ParamTarget, ParamValue, ParameterModel};
pub use engine::{AudioBuffer, Engine, RouteChanges, TransportState};
pub use error::{RackError, Result};
pub use host::{AudioHost, HostBackend, HostEvent, SimulatedBackend, SimulatedHost};
