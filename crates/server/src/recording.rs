//! Call recording
//!
//! Starts dual-channel recording through the telephony provider's REST API
//! once the media stream is up. The caller hears the recording notice
//! before this runs; failures here are logged and never end the call.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use call_agent_config::TelephonyConfig;
use call_agent_core::{CallRecorder, Result};

use crate::ServerError;

/// Recorder talking to the telephony provider's REST API
pub struct HttpCallRecorder {
    client: Client,
    config: TelephonyConfig,
}

impl HttpCallRecorder {
    pub fn new(config: TelephonyConfig) -> std::result::Result<Self, ServerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ServerError::Internal(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn recordings_url(&self, call_id: &str) -> String {
        format!(
            "{}/Calls/{}/Recordings.json",
            self.config.api_base.trim_end_matches('/'),
            call_id
        )
    }
}

#[async_trait]
impl CallRecorder for HttpCallRecorder {
    async fn start(&self, call_id: &str) -> Result<()> {
        let mut request = self
            .client
            .post(self.recordings_url(call_id))
            // Dual channel separates caller and agent audio
            .form(&[("RecordingChannels", "dual")]);

        if let (Some(sid), Some(token)) = (&self.config.account_sid, &self.config.auth_token) {
            request = request.basic_auth(sid, Some(token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| call_agent_core::Error::Telephony(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(call_agent_core::Error::Telephony(format!(
                "recording request failed with {}: {}",
                status, body
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| call_agent_core::Error::Telephony(e.to_string()))?;

        tracing::info!(
            call_sid = call_id,
            recording_sid = body["sid"].as_str().unwrap_or("-"),
            "recording started"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recordings_url() {
        let config = TelephonyConfig {
            api_base: "https://api.telephony.example/2010-04-01/Accounts/AC1/".to_string(),
            ..Default::default()
        };
        let recorder = HttpCallRecorder::new(config).unwrap();

        assert_eq!(
            recorder.recordings_url("CA1"),
            "https://api.telephony.example/2010-04-01/Accounts/AC1/Calls/CA1/Recordings.json"
        );
    }
}
