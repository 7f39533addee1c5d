//! OpenAI-compatible streaming chat backend
//!
//! Speaks the `/chat/completions` SSE protocol: each `data:` line carries a
//! JSON chunk with a content delta, tool-call fragments, or a finish
//! reason; the stream terminates with `data: [DONE]`.

use std::pin::Pin;
use std::time::Duration;

use async_stream::try_stream;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use call_agent_config::LlmConfig;
use call_agent_core::{
    ChatRequest, FinishReason, LanguageModel, Message, Result, StreamDelta, ToolCallDelta,
    ToolDefinition,
};

use crate::LlmError;

/// OpenAI-compatible backend
#[derive(Clone)]
pub struct OpenAiBackend {
    client: Client,
    config: LlmConfig,
}

impl OpenAiBackend {
    /// Create a new backend
    pub fn new(config: LlmConfig) -> std::result::Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Configuration(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.config.endpoint.trim_end_matches('/'), path)
    }

    fn build_body(&self, request: &ChatRequest) -> WireRequest {
        WireRequest {
            model: self.config.model.clone(),
            messages: request.messages.iter().map(WireMessage::from).collect(),
            tools: request.tools.iter().map(WireTool::from).collect(),
            temperature: request.temperature.or(Some(self.config.temperature)),
            max_tokens: request.max_tokens.or(Some(self.config.max_tokens)),
            stream: true,
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAiBackend {
    fn chat_stream<'a>(
        &'a self,
        request: ChatRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamDelta>> + Send + 'a>> {
        let body = self.build_body(&request);
        let url = self.api_url("/chat/completions");
        let client = self.client.clone();
        let api_key = self.config.api_key.clone();

        Box::pin(try_stream! {
            let mut http = client.post(&url).json(&body);
            if let Some(key) = &api_key {
                http = http.bearer_auth(key);
            }

            let response = http
                .send()
                .await
                .map_err(|e| call_agent_core::Error::Completion(e.to_string()))?;

            if !response.status().is_success() {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                Err(call_agent_core::Error::Completion(format!(
                    "completion request failed with {}: {}",
                    status, text
                )))?;
                unreachable!("error response already propagated above");
            }

            let mut bytes = response.bytes_stream();
            let mut buffer = String::new();
            let mut done = false;

            while let Some(chunk) = bytes.next().await {
                let chunk =
                    chunk.map_err(|e| call_agent_core::Error::Completion(e.to_string()))?;
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                while let Some(newline) = buffer.find('\n') {
                    let line: String = buffer.drain(..=newline).collect();
                    let line = line.trim();

                    let Some(payload) = line.strip_prefix("data:") else {
                        continue;
                    };
                    let payload = payload.trim();

                    if payload == "[DONE]" {
                        done = true;
                        break;
                    }

                    match serde_json::from_str::<WireChunk>(payload) {
                        Ok(parsed) => {
                            if let Some(delta) = map_chunk(parsed) {
                                yield delta;
                            }
                        }
                        Err(e) => {
                            tracing::warn!("unparsable completion chunk ({}): {}", e, payload);
                        }
                    }
                }

                if done {
                    break;
                }
            }
        })
    }

    async fn is_available(&self) -> bool {
        let mut request = self.client.get(self.api_url("/models"));
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }
        request
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

// Wire types

#[derive(Debug, Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role.as_str(),
            content: message.content.clone(),
            name: message.name.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunction,
}

#[derive(Debug, Serialize)]
struct WireFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

impl From<&ToolDefinition> for WireTool {
    fn from(tool: &ToolDefinition) -> Self {
        Self {
            kind: "function",
            function: WireFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.parameters.clone(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireChunk {
    #[serde(default)]
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    #[serde(default)]
    delta: WireDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct WireDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    #[serde(default)]
    function: Option<WireFunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct WireFunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

fn map_chunk(chunk: WireChunk) -> Option<StreamDelta> {
    let choice = chunk.choices.into_iter().next()?;

    let tool_call = choice
        .delta
        .tool_calls
        .and_then(|calls| calls.into_iter().next())
        .and_then(|call| call.function)
        .map(|function| ToolCallDelta {
            name: function.name,
            arguments: function.arguments,
        });

    let finish_reason = choice.finish_reason.as_deref().map(|reason| match reason {
        "tool_calls" => FinishReason::ToolCalls,
        "length" => FinishReason::Length,
        "content_filter" => FinishReason::ContentFilter,
        "stop" => FinishReason::Stop,
        other => {
            tracing::warn!("unknown finish reason '{}', treating as stop", other);
            FinishReason::Stop
        }
    });

    Some(StreamDelta {
        content: choice.delta.content,
        tool_call,
        finish_reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_content_chunk() {
        let chunk: WireChunk = serde_json::from_str(
            r#"{"choices":[{"delta":{"content":"Hello"},"finish_reason":null}]}"#,
        )
        .unwrap();

        let delta = map_chunk(chunk).unwrap();
        assert_eq!(delta.content.as_deref(), Some("Hello"));
        assert!(delta.tool_call.is_none());
        assert!(delta.finish_reason.is_none());
    }

    #[test]
    fn test_map_tool_fragment_chunk() {
        let chunk: WireChunk = serde_json::from_str(
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"name":"update_insurance_quote","arguments":"{\"denta"}}]},"finish_reason":null}]}"#,
        )
        .unwrap();

        let delta = map_chunk(chunk).unwrap();
        let fragment = delta.tool_call.unwrap();
        assert_eq!(fragment.name.as_deref(), Some("update_insurance_quote"));
        assert_eq!(fragment.arguments.as_deref(), Some("{\"denta"));
    }

    #[test]
    fn test_map_finish_chunk() {
        let chunk: WireChunk = serde_json::from_str(
            r#"{"choices":[{"delta":{},"finish_reason":"tool_calls"}]}"#,
        )
        .unwrap();

        let delta = map_chunk(chunk).unwrap();
        assert_eq!(delta.finish_reason, Some(FinishReason::ToolCalls));
    }

    #[test]
    fn test_request_body_shape() {
        let backend = OpenAiBackend::new(LlmConfig::default()).unwrap();
        let request = ChatRequest::new(vec![
            Message::system("persona"),
            Message::tool_result("transfer_call", "{\"status\":\"ok\"}"),
        ])
        .with_tools(vec![ToolDefinition::new(
            "transfer_call",
            "Transfers the caller",
            serde_json::json!({"type": "object"}),
        )]);

        let body = serde_json::to_value(backend.build_body(&request)).unwrap();
        assert_eq!(body["stream"], true);
        assert_eq!(body["messages"][1]["role"], "tool");
        assert_eq!(body["messages"][1]["name"], "transfer_call");
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "transfer_call");
    }

    #[test]
    fn test_api_url_trims_trailing_slash() {
        let mut config = LlmConfig::default();
        config.endpoint = "http://localhost:8000/v1/".to_string();
        let backend = OpenAiBackend::new(config).unwrap();
        assert_eq!(
            backend.api_url("/chat/completions"),
            "http://localhost:8000/v1/chat/completions"
        );
    }
}
