//! Speech processing traits

use async_trait::async_trait;

use crate::Result;

/// Text-to-speech interface
///
/// Treated as a black box: text in, encoded audio bytes out. Invoked once
/// per speakable segment.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync + 'static {
    /// Synthesize text to audio in the telephony leg's media format
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;

    /// Get engine name for logging
    fn engine_name(&self) -> &str;
}

/// Live speech recognition leg
///
/// The recognizer is an external event source; audio is pushed in and
/// recognition events arrive on the channel handed out at connect time.
#[async_trait]
pub trait RecognitionStream: Send + Sync + 'static {
    /// Forward raw caller audio to the recognizer
    async fn send_audio(&self, audio: &[u8]) -> Result<()>;

    /// Signal that no more audio will be sent
    async fn finish(&self) -> Result<()>;
}
