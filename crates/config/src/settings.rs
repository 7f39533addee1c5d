//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// LLM endpoint configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Speech recognition leg configuration
    #[serde(default)]
    pub recognition: RecognitionConfig,

    /// Speech synthesis configuration
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// Telephony provider configuration
    #[serde(default)]
    pub telephony: TelephonyConfig,

    /// Conversation behavior
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Session lifecycle
    #[serde(default)]
    pub session: SessionConfig,
}

impl Settings {
    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                message: "Port cannot be 0".to_string(),
            });
        }

        if self.llm.endpoint.is_empty() {
            return Err(ConfigError::MissingField("llm.endpoint".to_string()));
        }

        if self.conversation.pause_marker.chars().count() != 1 {
            return Err(ConfigError::InvalidValue {
                field: "conversation.pause_marker".to_string(),
                message: format!(
                    "Must be a single character, got '{}'",
                    self.conversation.pause_marker
                ),
            });
        }

        if self.conversation.max_tool_rounds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "conversation.max_tool_rounds".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }

        if self.session.max_sessions == 0 {
            return Err(ConfigError::InvalidValue {
                field: "session.max_sessions".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }

        if self.telephony.recording_enabled && self.telephony.api_base.is_empty() {
            return Err(ConfigError::MissingField(
                "telephony.api_base (required when recording is enabled)".to_string(),
            ));
        }

        if self.telephony.public_host.is_empty() {
            tracing::warn!(
                "telephony.public_host is not set; the voice webhook will emit an unusable stream URL"
            );
        }

        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// CORS allowed origins (empty = localhost only)
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_enabled: default_true(),
            cors_origins: Vec::new(),
        }
    }
}

/// LLM endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Chat completions base URL
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    /// API key (set via CALL_AGENT__LLM__API_KEY)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model identifier
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens per round
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_llm_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_llm_model() -> String {
    "gpt-4-1106-preview".to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    512
}
fn default_llm_timeout() -> u64 {
    60
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            api_key: None,
            model: default_llm_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

/// Speech recognition leg configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionConfig {
    /// Live transcription WebSocket endpoint
    #[serde(default = "default_recognition_endpoint")]
    pub endpoint: String,

    /// API key (set via CALL_AGENT__RECOGNITION__API_KEY)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Recognition model
    #[serde(default = "default_recognition_model")]
    pub model: String,

    /// Audio encoding of the telephony leg
    #[serde(default = "default_encoding")]
    pub encoding: String,

    /// Sample rate in Hz
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Enable automatic punctuation
    #[serde(default = "default_true")]
    pub punctuate: bool,

    /// Receive interim results (required for barge-in detection)
    #[serde(default = "default_true")]
    pub interim_results: bool,

    /// Pause detection window in milliseconds
    #[serde(default = "default_endpointing")]
    pub endpointing_ms: u32,

    /// Silence before an utterance-end event, in milliseconds
    #[serde(default = "default_utterance_end")]
    pub utterance_end_ms: u32,
}

fn default_recognition_endpoint() -> String {
    "wss://api.deepgram.com/v1/listen".to_string()
}
fn default_recognition_model() -> String {
    "nova-2".to_string()
}
fn default_encoding() -> String {
    "mulaw".to_string()
}
fn default_sample_rate() -> u32 {
    8000
}
fn default_endpointing() -> u32 {
    200
}
fn default_utterance_end() -> u32 {
    1000
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_recognition_endpoint(),
            api_key: None,
            model: default_recognition_model(),
            encoding: default_encoding(),
            sample_rate: default_sample_rate(),
            punctuate: default_true(),
            interim_results: default_true(),
            endpointing_ms: default_endpointing(),
            utterance_end_ms: default_utterance_end(),
        }
    }
}

/// Speech synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Synthesis endpoint URL
    #[serde(default = "default_synthesis_endpoint")]
    pub endpoint: String,

    /// API key (set via CALL_AGENT__SYNTHESIS__API_KEY)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Voice/model identifier
    #[serde(default = "default_voice")]
    pub voice: String,

    /// Output encoding, matching the telephony leg
    #[serde(default = "default_encoding")]
    pub encoding: String,

    /// Output sample rate in Hz
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Request timeout in seconds
    #[serde(default = "default_synthesis_timeout")]
    pub timeout_secs: u64,
}

fn default_synthesis_endpoint() -> String {
    "https://api.deepgram.com/v1/speak".to_string()
}
fn default_voice() -> String {
    "aura-asteria-en".to_string()
}
fn default_synthesis_timeout() -> u64 {
    30
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            endpoint: default_synthesis_endpoint(),
            api_key: None,
            voice: default_voice(),
            encoding: default_encoding(),
            sample_rate: default_sample_rate(),
            timeout_secs: default_synthesis_timeout(),
        }
    }
}

/// Telephony provider configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TelephonyConfig {
    /// Public hostname callers' media streams connect back to
    #[serde(default)]
    pub public_host: String,

    /// Provider REST API base URL
    #[serde(default)]
    pub api_base: String,

    /// Provider account identifier
    #[serde(default)]
    pub account_sid: Option<String>,

    /// Provider auth token (set via CALL_AGENT__TELEPHONY__AUTH_TOKEN)
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Record calls (announced to the caller before recording starts)
    #[serde(default)]
    pub recording_enabled: bool,
}

/// Conversation behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// System persona for the model
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Greeting spoken when the media stream starts
    #[serde(default = "default_greeting")]
    pub greeting: String,

    /// Notice spoken before recording starts
    #[serde(default = "default_recording_notice")]
    pub recording_notice: String,

    /// Marker the model inserts at natural pauses; bounds speakable segments
    #[serde(default = "default_pause_marker")]
    pub pause_marker: String,

    /// Minimum interim-utterance length that counts as an interruption
    #[serde(default = "default_min_interrupt_chars")]
    pub min_interrupt_chars: usize,

    /// Maximum consecutive tool rounds in one completion
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: u32,

    /// Spoken when a tool exceeds its execution deadline
    #[serde(default = "default_tool_fallback")]
    pub tool_fallback: String,
}

fn default_system_prompt() -> String {
    "You are an outbound sales representative for an insurance provider, helping \
     customers with health insurance plans. You have a professional yet empathetic \
     personality. Keep your responses clear and concise. Don't ask more than one \
     question at a time. Don't make assumptions about what values to plug into \
     functions; ask for clarification if a request is ambiguous. Speak out all \
     amounts and coverage details clearly, including the currency. You must add a \
     '\u{2022}' symbol every 5 to 10 words at natural pauses where your response \
     can be split for text to speech."
        .to_string()
}
fn default_greeting() -> String {
    "Hello! I see that you've received a quote for your health insurance plan. \
     Is there anything you would like to discuss about the coverage options?"
        .to_string()
}
fn default_recording_notice() -> String {
    "This call will be recorded.".to_string()
}
fn default_pause_marker() -> String {
    "\u{2022}".to_string()
}
fn default_min_interrupt_chars() -> usize {
    5
}
fn default_max_tool_rounds() -> u32 {
    5
}
fn default_tool_fallback() -> String {
    "I'm sorry, that's taking longer than expected. Let's continue.".to_string()
}

impl ConversationConfig {
    /// The configured pause marker as a char
    pub fn pause_marker_char(&self) -> char {
        self.pause_marker.chars().next().unwrap_or('\u{2022}')
    }
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            greeting: default_greeting(),
            recording_notice: default_recording_notice(),
            pause_marker: default_pause_marker(),
            min_interrupt_chars: default_min_interrupt_chars(),
            max_tool_rounds: default_max_tool_rounds(),
            tool_fallback: default_tool_fallback(),
        }
    }
}

/// Session lifecycle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Maximum concurrent calls
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Idle timeout in seconds before a session expires
    #[serde(default = "default_session_timeout")]
    pub timeout_secs: u64,

    /// Expired-session sweep interval in seconds
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
}

fn default_max_sessions() -> usize {
    100
}
fn default_session_timeout() -> u64 {
    3600
}
fn default_cleanup_interval() -> u64 {
    300
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
            timeout_secs: default_session_timeout(),
            cleanup_interval_secs: default_cleanup_interval(),
        }
    }
}

/// Load settings from files and environment
///
/// Priority (highest to lowest):
/// 1. Environment variables (CALL_AGENT prefix)
/// 2. config/{env}.toml (if env specified)
/// 3. config/default.toml
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("CALL_AGENT")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}
