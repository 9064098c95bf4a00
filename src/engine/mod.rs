//! Engine Module
//!
//! The runtime side of the rack:
//! - Decoded audio buffers and WAV decoding
//! - The Node Set and the Graph Router that wires it
//! - The transport state machine and the Playback Controller
//! - The Parameter Update Dispatcher

pub mod buffer;
pub mod decode;
mod dispatch;
pub mod nodes;
pub mod player;
pub mod router;
pub mod transport;

pub use buffer::{AudioBuffer, ChannelLayout, DEFAULT_SAMPLE_RATE};
pub use decode::{decode_audio, decode_file};
pub use nodes::{Edge, NodeRole, NodeSet};
pub use player::Engine;
pub use router::{plan, reconcile, RouteChanges};
pub use transport::{PendingRequest, TransportManager, TransportState};
