//! Error types shared across the workspace

use thiserror::Error;

/// Workspace-level result alias
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced across crate boundaries
///
/// Per-crate error enums convert into this at the seams. All variants are
/// scoped to the current round or event; none of them should terminate a
/// session.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Recognition error: {0}")]
    Recognition(String),

    #[error("Completion error: {0}")]
    Completion(String),

    #[error("Synthesis error: {0}")]
    Synthesis(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Playback error: {0}")]
    Playback(String),

    #[error("Telephony error: {0}")]
    Telephony(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Channel closed: {0}")]
    ChannelClosed(&'static str),
}

impl Error {
    /// Whether the failure is transient transport trouble that the session
    /// should simply log and survive.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Recognition(_) | Error::Completion(_) | Error::Synthesis(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(Error::Recognition("socket dropped".into()).is_transient());
        assert!(Error::Synthesis("timeout".into()).is_transient());
        assert!(!Error::Configuration("missing key".into()).is_transient());
    }

    #[test]
    fn test_display() {
        let err = Error::Tool("unknown tool: foo".into());
        assert_eq!(err.to_string(), "Tool error: unknown tool: foo");
    }
}
