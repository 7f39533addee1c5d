//! LLM streaming request/response types
//!
//! Common types for driving a streaming chat completion with tool support.

use serde::{Deserialize, Serialize};

use crate::message::Message;

/// Chat completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Full conversation history
    pub messages: Vec<Message>,
    /// Tool catalog offered to the model
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
    /// Temperature (0.0 - 2.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    /// Create a request from a message history
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            tools: Vec::new(),
            temperature: None,
            max_tokens: None,
        }
    }

    /// Offer a tool catalog
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    /// Set temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature.clamp(0.0, 2.0));
        self
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Tool definition offered to the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name
    pub name: String,
    /// Tool description
    pub description: String,
    /// JSON schema for parameters
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// One incremental delta from a streamed completion
///
/// A delta carries text content, a tool-call fragment, or a finish reason
/// (the last delta of a round). Tool-call fragments arrive split across
/// many deltas: the name in an early fragment, argument text spread over
/// the rest. Arguments must be concatenated and never parsed before the
/// stream reports its finish reason.
#[derive(Debug, Clone, Default)]
pub struct StreamDelta {
    /// Text content fragment
    pub content: Option<String>,
    /// Tool call fragment
    pub tool_call: Option<ToolCallDelta>,
    /// Present only on the final delta of the round
    pub finish_reason: Option<FinishReason>,
}

impl StreamDelta {
    /// A plain text fragment
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    /// A tool-call fragment
    pub fn tool_fragment(name: Option<String>, arguments: Option<String>) -> Self {
        Self {
            tool_call: Some(ToolCallDelta { name, arguments }),
            ..Default::default()
        }
    }

    /// The terminating delta of a round
    pub fn finished(reason: FinishReason) -> Self {
        Self {
            finish_reason: Some(reason),
            ..Default::default()
        }
    }
}

/// Fragment of a tool invocation request
#[derive(Debug, Clone, Default)]
pub struct ToolCallDelta {
    /// Function name fragment (usually complete in the first fragment)
    pub name: Option<String>,
    /// Argument text fragment, to be concatenated with its siblings
    pub arguments: Option<String>,
}

/// Why the model stopped generating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Normal completion
    #[default]
    Stop,
    /// The model requested a tool invocation
    ToolCalls,
    /// Hit the max-token limit
    Length,
    /// Content was filtered
    ContentFilter,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    #[test]
    fn test_request_builder() {
        let req = ChatRequest::new(vec![Message::system("sys"), Message::user("hi")])
            .with_temperature(0.4)
            .with_max_tokens(256);

        assert_eq!(req.messages.len(), 2);
        assert_eq!(req.temperature, Some(0.4));
        assert_eq!(req.max_tokens, Some(256));
    }

    #[test]
    fn test_temperature_clamped() {
        let req = ChatRequest::new(vec![]).with_temperature(3.5);
        assert_eq!(req.temperature, Some(2.0));
    }

    #[test]
    fn test_finish_reason_parsing() {
        let reason: FinishReason = serde_json::from_str("\"tool_calls\"").unwrap();
        assert_eq!(reason, FinishReason::ToolCalls);
    }

    #[test]
    fn test_delta_constructors() {
        let text = StreamDelta::text("Hello");
        assert_eq!(text.content.as_deref(), Some("Hello"));
        assert!(text.finish_reason.is_none());

        let done = StreamDelta::finished(FinishReason::Stop);
        assert_eq!(done.finish_reason, Some(FinishReason::Stop));
    }
}
