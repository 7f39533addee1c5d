//! Playback sink bridging to the connection task
//!
//! Serializes outbound frames and hands them to the WebSocket send task
//! over a channel, so emitter and controller never touch the socket
//! directly. The stream id arrives with the `start` frame and is stamped
//! onto every outbound frame.

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::mpsc;

use call_agent_core::{PlaybackSink, Result};

use crate::protocol::OutboundFrame;
use crate::TransportError;

/// Channel-backed playback sink
pub struct FrameSink {
    frames_tx: mpsc::UnboundedSender<String>,
    stream_sid: RwLock<String>,
}

impl FrameSink {
    /// Create a sink writing serialized frames to the given channel
    pub fn new(frames_tx: mpsc::UnboundedSender<String>) -> Self {
        Self {
            frames_tx,
            stream_sid: RwLock::new(String::new()),
        }
    }

    fn send_frame(&self, frame: OutboundFrame) -> Result<()> {
        let json = serde_json::to_string(&frame)
            .map_err(|e| TransportError::MalformedFrame(e.to_string()))?;
        self.frames_tx
            .send(json)
            .map_err(|_| TransportError::ConnectionClosed.into())
    }

    fn stream_sid(&self) -> String {
        self.stream_sid.read().clone()
    }
}

#[async_trait]
impl PlaybackSink for FrameSink {
    async fn send_audio(&self, payload: &str) -> Result<()> {
        self.send_frame(OutboundFrame::media(self.stream_sid(), payload))
    }

    async fn send_mark(&self, label: &str) -> Result<()> {
        self.send_frame(OutboundFrame::mark(self.stream_sid(), label))
    }

    async fn clear(&self) -> Result<()> {
        self.send_frame(OutboundFrame::clear(self.stream_sid()))
    }

    fn set_stream_id(&self, stream_id: &str) {
        *self.stream_sid.write() = stream_id.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_frames_carry_stream_sid() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = FrameSink::new(tx);
        sink.set_stream_id("MZ42");

        sink.send_audio("AAAA").await.unwrap();
        sink.send_mark("m-1").await.unwrap();
        sink.clear().await.unwrap();

        let media: serde_json::Value =
            serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(media["event"], "media");
        assert_eq!(media["streamSid"], "MZ42");
        assert_eq!(media["media"]["payload"], "AAAA");

        let mark: serde_json::Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(mark["event"], "mark");
        assert_eq!(mark["mark"]["name"], "m-1");

        let clear: serde_json::Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(clear["event"], "clear");
    }

    #[tokio::test]
    async fn test_closed_channel_surfaces_error() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let sink = FrameSink::new(tx);

        assert!(sink.send_audio("AAAA").await.is_err());
    }
}
