//! Core traits and types for the call agent
//!
//! This crate provides foundational types used across all other crates:
//! - Conversation messages and the per-call context
//! - Typed pipeline events (recognition, transcripts, segments, audio, acks)
//! - LLM streaming request/response types
//! - Core traits for pluggable backends (LLM, synthesis, recognition, playback)
//! - Error types

pub mod error;
pub mod events;
pub mod llm_types;
pub mod message;
pub mod traits;

pub use error::{Error, Result};
pub use events::{
    AckToken, AudioChunk, RecognitionEvent, RecognitionEventKind, SessionEvent, SpeakableSegment,
    TranscriptSignal,
};
pub use llm_types::{ChatRequest, FinishReason, StreamDelta, ToolCallDelta, ToolDefinition};
pub use message::{ConversationContext, Message, Role};

pub use traits::{CallRecorder, LanguageModel, PlaybackSink, RecognitionStream, SpeechSynthesizer};
