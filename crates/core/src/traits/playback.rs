//! Playback sink and telephony-side traits

use async_trait::async_trait;

use crate::Result;

/// The telephony leg's playback side
///
/// The ordered audio emitter performs two writes per chunk: the media
/// payload itself and a mark frame carrying the chunk's acknowledgment
/// token. The conversation controller issues `clear` on barge-in.
#[async_trait]
pub trait PlaybackSink: Send + Sync + 'static {
    /// Write one base64-encoded media payload
    async fn send_audio(&self, payload: &str) -> Result<()>;

    /// Write a mark frame carrying an acknowledgment label
    async fn send_mark(&self, label: &str) -> Result<()>;

    /// Abandon all audio queued on the telephony leg
    async fn clear(&self) -> Result<()>;

    /// Record the telephony stream identifier once the leg announces it
    fn set_stream_id(&self, _stream_id: &str) {}
}

/// Starts call recording on the telephony provider
#[async_trait]
pub trait CallRecorder: Send + Sync + 'static {
    /// Begin recording the given call; failures are logged, never fatal
    async fn start(&self, call_id: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingSink {
        clears: AtomicUsize,
    }

    #[async_trait]
    impl PlaybackSink for CountingSink {
        async fn send_audio(&self, _payload: &str) -> Result<()> {
            Ok(())
        }

        async fn send_mark(&self, _label: &str) -> Result<()> {
            Ok(())
        }

        async fn clear(&self) -> Result<()> {
            self.clears.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_sink_object_safety() {
        let sink: Box<dyn PlaybackSink> = Box::<CountingSink>::default();
        sink.send_audio("AAAA").await.unwrap();
        sink.clear().await.unwrap();
    }
}
