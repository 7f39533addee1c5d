//! Streaming LLM backend for the call agent
//!
//! Implements the `LanguageModel` trait against OpenAI-compatible chat
//! completion endpoints with server-sent-event streaming and tool support.

pub mod backend;

pub use backend::OpenAiBackend;

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            LlmError::Network(err.to_string())
        } else {
            LlmError::Api(err.to_string())
        }
    }
}

impl From<LlmError> for call_agent_core::Error {
    fn from(err: LlmError) -> Self {
        call_agent_core::Error::Completion(err.to_string())
    }
}
