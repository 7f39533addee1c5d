//! Telephony transport for the call agent
//!
//! - `protocol` - media-stream wire messages exchanged with the telephony leg
//! - `emitter` - ordered audio delivery with out-of-order buffering
//! - `sink` - playback sink writing outbound frames to the connection task

pub mod emitter;
pub mod protocol;
pub mod sink;

pub use emitter::OrderedAudioEmitter;
pub use protocol::{MediaPayload, MediaStreamMessage, MarkMeta, OutboundFrame, StartMeta};
pub use sink::FrameSink;

use thiserror::Error;

/// Transport errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Malformed frame: {0}")]
    MalformedFrame(String),
}

impl From<TransportError> for call_agent_core::Error {
    fn from(err: TransportError) -> Self {
        call_agent_core::Error::Playback(err.to_string())
    }
}
