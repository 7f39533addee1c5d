//! Speech legs of the call agent
//!
//! - `stt` - transcript assembly from live recognition events, plus the
//!   outbound WebSocket client feeding audio to the recognizer
//! - `tts` - HTTP speech synthesis client

pub mod stt;
pub mod tts;

pub use stt::{LiveRecognizer, TranscriptAssembler};
pub use tts::HttpSynthesizer;

use thiserror::Error;

/// Pipeline errors
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Recognizer connection error: {0}")]
    Connection(String),

    #[error("Recognizer protocol error: {0}")]
    Protocol(String),

    #[error("Synthesis error: {0}")]
    Synthesis(String),
}

impl From<PipelineError> for call_agent_core::Error {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Synthesis(msg) => call_agent_core::Error::Synthesis(msg),
            other => call_agent_core::Error::Recognition(other.to_string()),
        }
    }
}
