//! Language model trait

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::llm_types::{ChatRequest, StreamDelta};
use crate::Result;

/// Streaming chat completion interface
///
/// Implementations:
/// - `OpenAiBackend` - OpenAI-compatible chat completion endpoints
///
/// # Example
///
/// ```ignore
/// let llm: Arc<dyn LanguageModel> = Arc::new(OpenAiBackend::new(config)?);
/// let request = ChatRequest::new(context.messages().to_vec())
///     .with_tools(registry.definitions());
/// let mut stream = llm.chat_stream(request);
/// while let Some(delta) = stream.next().await { /* ... */ }
/// ```
#[async_trait]
pub trait LanguageModel: Send + Sync + 'static {
    /// Open a streaming completion for the given request
    ///
    /// The stream yields incremental deltas in generation order and ends
    /// after the delta carrying the finish reason.
    fn chat_stream<'a>(
        &'a self,
        request: ChatRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamDelta>> + Send + 'a>>;

    /// Check if the backend is reachable
    async fn is_available(&self) -> bool;

    /// Get model name for logging
    fn model_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_types::FinishReason;
    use futures::StreamExt;

    struct MockLlm;

    #[async_trait]
    impl LanguageModel for MockLlm {
        fn chat_stream<'a>(
            &'a self,
            _request: ChatRequest,
        ) -> Pin<Box<dyn Stream<Item = Result<StreamDelta>> + Send + 'a>> {
            Box::pin(futures::stream::iter(vec![
                Ok(StreamDelta::text("Hello")),
                Ok(StreamDelta::finished(FinishReason::Stop)),
            ]))
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn model_name(&self) -> &str {
            "mock-llm"
        }
    }

    #[tokio::test]
    async fn test_mock_stream() {
        let llm = MockLlm;
        let deltas: Vec<_> = llm
            .chat_stream(ChatRequest::new(vec![]))
            .collect::<Vec<_>>()
            .await;

        assert_eq!(deltas.len(), 2);
        assert!(deltas[1].as_ref().unwrap().finish_reason.is_some());
    }
}
