//! HTTP speech synthesis client
//!
//! Text in, encoded audio bytes out. The synthesis engine is a black box
//! behind a REST endpoint; output encoding and sample rate are negotiated
//! via query parameters so the audio matches the telephony leg.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use call_agent_config::SynthesisConfig;
use call_agent_core::{Result, SpeechSynthesizer};

use crate::PipelineError;

/// Speech synthesizer backed by an HTTP endpoint
pub struct HttpSynthesizer {
    client: Client,
    config: SynthesisConfig,
}

#[derive(Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
}

impl HttpSynthesizer {
    /// Create a new synthesizer client
    pub fn new(config: SynthesisConfig) -> std::result::Result<Self, PipelineError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PipelineError::Synthesis(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn request_url(&self) -> String {
        format!(
            "{}?model={}&encoding={}&sample_rate={}&container=none",
            self.config.endpoint, self.config.voice, self.config.encoding, self.config.sample_rate,
        )
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let mut request = self
            .client
            .post(self.request_url())
            .json(&SynthesisRequest { text });

        if let Some(key) = &self.config.api_key {
            request = request.header("Authorization", format!("Token {}", key));
        }

        let response = request
            .send()
            .await
            .map_err(|e| call_agent_core::Error::Synthesis(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(call_agent_core::Error::Synthesis(format!(
                "synthesis request failed with {}: {}",
                status, body
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| call_agent_core::Error::Synthesis(e.to_string()))?;

        Ok(bytes.to_vec())
    }

    fn engine_name(&self) -> &str {
        &self.config.voice
    }
}
