//! Conversation orchestration for the call agent
//!
//! - `segment` - splits streamed completion text into speakable segments
//! - `orchestrator` - drives completion rounds and resolves tool calls
//! - `controller` - per-call integration point: wiring, barge-in, call state

pub mod controller;
pub mod orchestrator;
pub mod segment;

pub use controller::{spawn_synthesis_dispatcher, ControllerDeps, ConversationController};
pub use orchestrator::{CompletionInput, CompletionOrchestrator};
pub use segment::ReplySegmenter;

use thiserror::Error;

/// Agent errors
///
/// All of these are scoped to one completion round or one event; the
/// session survives them.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Completion stream error: {0}")]
    Stream(String),

    #[error("Malformed tool arguments: {0}")]
    ToolArguments(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Tool execution failed: {0}")]
    ToolExecution(String),

    #[error("Tool round limit ({0}) exceeded")]
    ToolRoundLimit(u32),

    #[error("Playback error: {0}")]
    Playback(String),

    #[error("Session channel closed: {0}")]
    ChannelClosed(&'static str),
}
