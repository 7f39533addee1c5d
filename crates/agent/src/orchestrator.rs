//! Completion orchestration
//!
//! Owns the conversation context for one call and drives streaming
//! completion rounds against the model. A round ends either in ordinary
//! text or in a tool-call request; tool calls are resolved and the next
//! round streams with the tool result appended, up to a configured round
//! limit. Speakable segments leave on a channel as soon as the segmenter
//! cuts them, so playback starts while the model is still generating.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;

use call_agent_config::ConversationConfig;
use call_agent_core::{
    ChatRequest, ConversationContext, FinishReason, LanguageModel, Message, SpeakableSegment,
};
use call_agent_tools::ToolExecutor;

use crate::segment::ReplySegmenter;
use crate::AgentError;

/// Inputs accepted by the orchestrator task
#[derive(Debug)]
pub enum CompletionInput {
    /// Finalized caller transcript; opens a completion round
    Transcript { text: String, interaction: u32 },
    /// Context-only system note (e.g. the call id for the transfer tool)
    SystemNote { text: String },
}

/// Accumulated tool-call request for one streamed round
///
/// Name and argument text arrive as fragments; arguments are only parsed
/// once the stream reports its finish reason.
#[derive(Debug, Default)]
struct PendingToolCall {
    name: String,
    arguments: String,
}

enum RoundOutcome {
    /// Round ended in ordinary text
    Done,
    /// Round ended requesting a tool invocation
    ToolCall(PendingToolCall),
}

/// Completion orchestrator for one call
pub struct CompletionOrchestrator {
    llm: Arc<dyn LanguageModel>,
    tools: Arc<dyn ToolExecutor>,
    context: ConversationContext,
    segmenter: ReplySegmenter,
    segments_tx: mpsc::Sender<SpeakableSegment>,
    max_tool_rounds: u32,
    tool_fallback: String,
}

impl CompletionOrchestrator {
    /// Create an orchestrator with the context seeded from configuration
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        tools: Arc<dyn ToolExecutor>,
        conversation: &ConversationConfig,
        segments_tx: mpsc::Sender<SpeakableSegment>,
    ) -> Self {
        let mut context = ConversationContext::with_system_prompt(&conversation.system_prompt);
        context.push(Message::assistant(&conversation.greeting));

        Self {
            llm,
            tools,
            context,
            segmenter: ReplySegmenter::new(conversation.pause_marker_char()),
            segments_tx,
            max_tool_rounds: conversation.max_tool_rounds,
            tool_fallback: conversation.tool_fallback.clone(),
        }
    }

    /// Drive the orchestrator from its input channel until the session ends
    pub async fn run(mut self, mut inputs: mpsc::Receiver<CompletionInput>) {
        while let Some(input) = inputs.recv().await {
            match input {
                CompletionInput::SystemNote { text } => {
                    self.context.push(Message::system(text));
                }
                CompletionInput::Transcript { text, interaction } => {
                    if let Err(e) = self.complete(&text, interaction).await {
                        tracing::error!(interaction, error = %e, "completion failed");
                    }
                }
            }
        }
    }

    /// Run one completion for a caller transcript, following tool calls
    pub async fn complete(&mut self, text: &str, interaction: u32) -> Result<(), AgentError> {
        self.context.push(Message::user(text));

        // One initial round plus at most max_tool_rounds follow-ups
        for _ in 0..=self.max_tool_rounds {
            match self.stream_round(interaction).await? {
                RoundOutcome::Done => return Ok(()),
                RoundOutcome::ToolCall(pending) => {
                    self.resolve_tool_call(pending, interaction).await?;
                }
            }
        }

        Err(AgentError::ToolRoundLimit(self.max_tool_rounds))
    }

    /// View the conversation context
    pub fn context(&self) -> &ConversationContext {
        &self.context
    }

    async fn stream_round(&mut self, interaction: u32) -> Result<RoundOutcome, AgentError> {
        let request = ChatRequest::new(self.context.messages().to_vec())
            .with_tools(self.tools.definitions());

        let llm = self.llm.clone();
        let mut stream = llm.chat_stream(request);

        let mut round_text = String::new();
        let mut pending = PendingToolCall::default();
        let mut finish = None;

        while let Some(delta) = stream.next().await {
            let delta = delta.map_err(|e| AgentError::Stream(e.to_string()))?;

            if let Some(fragment) = delta.tool_call {
                // First non-empty name wins; argument fragments concatenate
                if let Some(name) = fragment.name {
                    if pending.name.is_empty() && !name.is_empty() {
                        pending.name = name;
                    }
                }
                if let Some(arguments) = fragment.arguments {
                    pending.arguments.push_str(&arguments);
                }
            }

            if let Some(content) = delta.content {
                round_text.push_str(&content);
                for segment in self.segmenter.push(&content, interaction) {
                    self.emit(segment).await?;
                }
            }

            if let Some(reason) = delta.finish_reason {
                finish = Some(reason);
            }
        }

        if finish == Some(FinishReason::ToolCalls) {
            return Ok(RoundOutcome::ToolCall(pending));
        }

        if let Some(segment) = self.segmenter.flush(interaction) {
            self.emit(segment).await?;
        }

        if !round_text.is_empty() {
            self.context.push(Message::assistant(round_text));
        }

        Ok(RoundOutcome::Done)
    }

    async fn resolve_tool_call(
        &mut self,
        pending: PendingToolCall,
        interaction: u32,
    ) -> Result<(), AgentError> {
        if pending.name.is_empty() {
            return Err(AgentError::Stream(
                "tool call finished without a function name".to_string(),
            ));
        }

        let announcement = self
            .tools
            .announcement(&pending.name)
            .ok_or_else(|| AgentError::UnknownTool(pending.name.clone()))?;

        let arguments = parse_tool_arguments(&pending.arguments)?;

        // Spoken before execution so slow tools get immediate acknowledgment
        self.emit(SpeakableSegment::out_of_band(announcement, interaction))
            .await?;

        tracing::info!(tool = %pending.name, "invoking tool");

        match self.tools.execute(&pending.name, arguments).await {
            Ok(result) => {
                self.context
                    .push(Message::tool_result(&pending.name, result.to_string()));
                Ok(())
            }
            Err(e) if e.is_timeout() => {
                self.emit(SpeakableSegment::out_of_band(
                    self.tool_fallback.clone(),
                    interaction,
                ))
                .await?;
                Err(AgentError::ToolExecution(e.to_string()))
            }
            Err(e) => Err(AgentError::ToolExecution(e.to_string())),
        }
    }

    async fn emit(&self, segment: SpeakableSegment) -> Result<(), AgentError> {
        self.segments_tx
            .send(segment)
            .await
            .map_err(|_| AgentError::ChannelClosed("segments"))
    }
}

/// Parse accumulated tool arguments
///
/// The provider occasionally concatenates the same JSON object twice.
/// Recovery is intentionally narrow: when more than one `{` is present,
/// re-parse the prefix up to the first `}`. A failure after that aborts
/// the round; the tool is never executed on guessed arguments.
fn parse_tool_arguments(raw: &str) -> Result<serde_json::Value, AgentError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(serde_json::json!({}));
    }

    match serde_json::from_str(trimmed) {
        Ok(value) => Ok(value),
        Err(first_error) => {
            if trimmed.find('{') != trimmed.rfind('{') {
                tracing::warn!("duplicated tool arguments returned by provider: {}", raw);
                if let Some(end) = trimmed.find('}') {
                    if let Ok(value) = serde_json::from_str(&trimmed[..=end]) {
                        return Ok(value);
                    }
                }
            }
            Err(AgentError::ToolArguments(first_error.to_string()))
        }
    }
}
