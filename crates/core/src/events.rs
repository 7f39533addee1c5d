//! Typed events exchanged between the per-call components
//!
//! Each channel between the transcript assembler, completion orchestrator,
//! synthesis dispatcher, audio emitter, and conversation controller carries
//! one of these variants rather than stringly-typed event names.

use serde::{Deserialize, Serialize};

/// One event from the speech recognizer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionEvent {
    /// Event kind as reported by the recognizer
    pub kind: RecognitionEventKind,
    /// Transcript text (may be empty, e.g. for utterance-end events)
    #[serde(default)]
    pub transcript: String,
    /// The recognizer will not revise this text further
    #[serde(default)]
    pub is_final: bool,
    /// A natural pause in speech was detected
    #[serde(default)]
    pub speech_final: bool,
}

/// Recognition event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub enum RecognitionEventKind {
    /// Ordinary transcript event (interim or final)
    #[default]
    Normal,
    /// The recognizer decided the utterance has ended
    UtteranceEnd,
}

impl RecognitionEvent {
    /// An interim (non-final) transcript event
    pub fn interim(text: impl Into<String>) -> Self {
        Self {
            kind: RecognitionEventKind::Normal,
            transcript: text.into(),
            is_final: false,
            speech_final: false,
        }
    }

    /// A final transcript event, optionally pause-terminated
    pub fn final_text(text: impl Into<String>, speech_final: bool) -> Self {
        Self {
            kind: RecognitionEventKind::Normal,
            transcript: text.into(),
            is_final: true,
            speech_final,
        }
    }

    /// An utterance-end marker
    pub fn utterance_end() -> Self {
        Self {
            kind: RecognitionEventKind::UtteranceEnd,
            transcript: String::new(),
            is_final: false,
            speech_final: false,
        }
    }
}

/// Output of the transcript assembler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptSignal {
    /// Finalized caller utterance, ready for a completion round
    Final(String),
    /// Raw interim text, used only for barge-in detection
    Interim(String),
}

/// A span of assistant text ready for speech synthesis
///
/// `index` is `None` for out-of-band announcements (greeting, recording
/// notice, tool announcements); sequenced dialogue carries a per-session
/// monotonic index that defines playback order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeakableSegment {
    pub index: Option<u64>,
    pub text: String,
    /// Which caller interaction this reply belongs to
    pub interaction: u32,
}

impl SpeakableSegment {
    /// Sequenced dialogue segment
    pub fn sequenced(index: u64, text: impl Into<String>, interaction: u32) -> Self {
        Self {
            index: Some(index),
            text: text.into(),
            interaction,
        }
    }

    /// Out-of-band announcement, played as soon as it is synthesized
    pub fn out_of_band(text: impl Into<String>, interaction: u32) -> Self {
        Self {
            index: None,
            text: text.into(),
            interaction,
        }
    }
}

/// Synthesized audio for one speakable segment
///
/// The payload is base64-encoded media in the telephony leg's format; the
/// index matches the originating segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    pub index: Option<u64>,
    pub payload: String,
}

/// Opaque identifier for one audio chunk in flight to the caller
///
/// Generated per chunk written to the playback sink; removed from the
/// outstanding set when the telephony leg confirms playback.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AckToken(String);

impl AckToken {
    /// Generate a fresh token
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for AckToken {
    fn from(label: String) -> Self {
        Self(label)
    }
}

impl std::fmt::Display for AckToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session-level notifications for outer wiring (transcript store, logs)
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A finalized caller utterance
    CallerTranscript(String),
    /// An agent reply segment handed to synthesis
    AgentReply { interaction: u32, text: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ack_token_uniqueness() {
        let a = AckToken::generate();
        let b = AckToken::generate();
        assert_ne!(a, b);
        assert!(!a.as_str().is_empty());
    }

    #[test]
    fn test_segment_constructors() {
        let oob = SpeakableSegment::out_of_band("One moment.", 3);
        assert_eq!(oob.index, None);

        let seq = SpeakableSegment::sequenced(7, "Hello there", 3);
        assert_eq!(seq.index, Some(7));
        assert_eq!(seq.interaction, 3);
    }

    #[test]
    fn test_recognition_event_kind_parsing() {
        let json = r#"{"kind":"UtteranceEnd"}"#;
        let event: RecognitionEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.kind, RecognitionEventKind::UtteranceEnd);
        assert!(!event.is_final);
    }
}
