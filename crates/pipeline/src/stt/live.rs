//! Live recognition WebSocket client
//!
//! Connects to a Deepgram-style live transcription endpoint, forwards raw
//! caller audio as binary frames, and surfaces recognition events on a
//! channel. The recognizer is a black box; only the event shape at the
//! interface is interpreted here.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;

use call_agent_config::RecognitionConfig;
use call_agent_core::{RecognitionEvent, RecognitionEventKind, RecognitionStream, Result};

use crate::PipelineError;

/// Capacity for the outbound audio queue (frames, not bytes)
const AUDIO_QUEUE_CAPACITY: usize = 256;

enum AudioCommand {
    Frame(Vec<u8>),
    Finish,
}

/// Handle to one live recognition connection
///
/// Dropping the handle closes the audio leg; the event channel ends when
/// the recognizer closes its side.
pub struct LiveRecognizer {
    audio_tx: mpsc::Sender<AudioCommand>,
}

impl LiveRecognizer {
    /// Connect and start the reader/writer tasks
    ///
    /// Returns the handle plus the recognition event channel.
    pub async fn connect(
        config: &RecognitionConfig,
    ) -> std::result::Result<(Self, mpsc::Receiver<RecognitionEvent>), PipelineError> {
        let url = format!(
            "{}?model={}&encoding={}&sample_rate={}&punctuate={}&interim_results={}&endpointing={}&utterance_end_ms={}",
            config.endpoint,
            config.model,
            config.encoding,
            config.sample_rate,
            config.punctuate,
            config.interim_results,
            config.endpointing_ms,
            config.utterance_end_ms,
        );

        let mut request = url
            .into_client_request()
            .map_err(|e| PipelineError::Connection(e.to_string()))?;

        if let Some(key) = &config.api_key {
            let value = HeaderValue::from_str(&format!("Token {}", key))
                .map_err(|e| PipelineError::Connection(e.to_string()))?;
            request.headers_mut().insert("Authorization", value);
        }

        let (socket, _) = connect_async(request)
            .await
            .map_err(|e| PipelineError::Connection(e.to_string()))?;
        let (mut writer, mut reader) = socket.split();

        let (audio_tx, mut audio_rx) = mpsc::channel::<AudioCommand>(AUDIO_QUEUE_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel::<RecognitionEvent>(AUDIO_QUEUE_CAPACITY);

        tokio::spawn(async move {
            while let Some(command) = audio_rx.recv().await {
                let message = match command {
                    AudioCommand::Frame(bytes) => Message::Binary(bytes),
                    AudioCommand::Finish => Message::Text(r#"{"type":"CloseStream"}"#.to_string()),
                };
                if let Err(e) = writer.send(message).await {
                    tracing::warn!("recognizer audio leg closed: {}", e);
                    break;
                }
            }
        });

        tokio::spawn(async move {
            while let Some(frame) = reader.next().await {
                let text = match frame {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Close(_)) => {
                        tracing::debug!("recognizer closed the connection");
                        break;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        tracing::warn!("recognizer read error: {}", e);
                        break;
                    }
                };

                match parse_provider_event(&text) {
                    Some(event) => {
                        if event_tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    None => tracing::trace!("ignoring recognizer frame: {}", text),
                }
            }
        });

        Ok((Self { audio_tx }, event_rx))
    }
}

#[async_trait]
impl RecognitionStream for LiveRecognizer {
    async fn send_audio(&self, audio: &[u8]) -> Result<()> {
        self.audio_tx
            .send(AudioCommand::Frame(audio.to_vec()))
            .await
            .map_err(|_| call_agent_core::Error::Recognition("audio leg closed".to_string()))
    }

    async fn finish(&self) -> Result<()> {
        self.audio_tx
            .send(AudioCommand::Finish)
            .await
            .map_err(|_| call_agent_core::Error::Recognition("audio leg closed".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct ProviderEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    channel: Option<ProviderChannel>,
    #[serde(default)]
    is_final: bool,
    #[serde(default)]
    speech_final: bool,
}

#[derive(Debug, Deserialize)]
struct ProviderChannel {
    #[serde(default)]
    alternatives: Vec<ProviderAlternative>,
}

#[derive(Debug, Deserialize)]
struct ProviderAlternative {
    #[serde(default)]
    transcript: String,
}

fn parse_provider_event(text: &str) -> Option<RecognitionEvent> {
    let event: ProviderEvent = serde_json::from_str(text).ok()?;

    match event.kind.as_str() {
        "UtteranceEnd" => Some(RecognitionEvent {
            kind: RecognitionEventKind::UtteranceEnd,
            transcript: String::new(),
            is_final: false,
            speech_final: false,
        }),
        "Results" => {
            let transcript = event
                .channel
                .and_then(|c| c.alternatives.into_iter().next())
                .map(|a| a.transcript)
                .unwrap_or_default();
            Some(RecognitionEvent {
                kind: RecognitionEventKind::Normal,
                transcript,
                is_final: event.is_final,
                speech_final: event.speech_final,
            })
        }
        // Metadata, warnings and other frames are not transcription events
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_results_event() {
        let text = r#"{
            "type": "Results",
            "channel": {"alternatives": [{"transcript": "hello world"}]},
            "is_final": true,
            "speech_final": true
        }"#;

        let event = parse_provider_event(text).unwrap();
        assert_eq!(event.kind, RecognitionEventKind::Normal);
        assert_eq!(event.transcript, "hello world");
        assert!(event.is_final);
        assert!(event.speech_final);
    }

    #[test]
    fn test_parse_utterance_end() {
        let text = r#"{"type": "UtteranceEnd", "last_word_end": 3.1}"#;
        let event = parse_provider_event(text).unwrap();
        assert_eq!(event.kind, RecognitionEventKind::UtteranceEnd);
    }

    #[test]
    fn test_metadata_ignored() {
        let text = r#"{"type": "Metadata", "request_id": "abc"}"#;
        assert!(parse_provider_event(text).is_none());
    }

    #[test]
    fn test_missing_alternatives_yields_empty_transcript() {
        let text = r#"{"type": "Results", "channel": {"alternatives": []}, "is_final": false}"#;
        let event = parse_provider_event(text).unwrap();
        assert!(event.transcript.is_empty());
        assert!(!event.is_final);
    }
}
