//! Call agent server
//!
//! HTTP endpoints for the telephony provider (voice webhook, media-stream
//! WebSocket) plus transcript presentation and operational endpoints.

pub mod connection;
pub mod http;
pub mod metrics;
pub mod recording;
pub mod session;
pub mod state;
pub mod transcripts;

pub use http::create_router;
pub use session::{Session, SessionManager};
pub use state::AppState;
pub use transcripts::{Speaker, TranscriptLine, TranscriptStore};

use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Session error: {0}")]
    Session(String),

    #[error("Media stream error: {0}")]
    MediaStream(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ServerError> for axum::http::StatusCode {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::Session(_) => axum::http::StatusCode::NOT_FOUND,
            ServerError::MediaStream(_) => axum::http::StatusCode::BAD_REQUEST,
            ServerError::InvalidRequest(_) => axum::http::StatusCode::BAD_REQUEST,
            ServerError::Internal(_) => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
