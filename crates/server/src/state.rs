//! Application state
//!
//! Shared state across all handlers. Built once at startup; tool registry
//! construction fails fast on a broken catalog.

use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusHandle;

use call_agent_config::Settings;
use call_agent_core::{LanguageModel, SpeechSynthesizer};
use call_agent_llm::OpenAiBackend;
use call_agent_pipeline::HttpSynthesizer;
use call_agent_tools::{create_insurance_registry, ToolRegistry};

use crate::metrics::init_metrics;
use crate::session::SessionManager;
use crate::transcripts::TranscriptStore;
use crate::ServerError;

/// Application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration
    pub settings: Arc<Settings>,
    /// Session manager
    pub sessions: Arc<SessionManager>,
    /// Tool registry, shared read-only across sessions
    pub tools: Arc<ToolRegistry>,
    /// LLM backend
    pub llm: Arc<dyn LanguageModel>,
    /// Speech synthesizer
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    /// Per-call transcripts
    pub transcripts: Arc<TranscriptStore>,
    /// Prometheus render handle
    pub metrics: PrometheusHandle,
}

impl AppState {
    /// Build the full state from settings
    pub fn new(settings: Settings) -> Result<Self, ServerError> {
        let tools = create_insurance_registry()
            .map_err(|e| ServerError::Internal(format!("tool catalog rejected: {}", e)))?;

        let llm = OpenAiBackend::new(settings.llm.clone())
            .map_err(|e| ServerError::Internal(format!("LLM backend: {}", e)))?;

        let synthesizer = HttpSynthesizer::new(settings.synthesis.clone())
            .map_err(|e| ServerError::Internal(format!("synthesizer: {}", e)))?;

        let sessions = Arc::new(SessionManager::new(
            settings.session.max_sessions,
            Duration::from_secs(settings.session.timeout_secs),
            Duration::from_secs(settings.session.cleanup_interval_secs),
        ));

        let metrics = init_metrics()?;

        Ok(Self {
            settings: Arc::new(settings),
            sessions,
            tools: Arc::new(tools),
            llm: Arc::new(llm),
            synthesizer: Arc::new(synthesizer),
            transcripts: Arc::new(TranscriptStore::new()),
            metrics,
        })
    }
}
