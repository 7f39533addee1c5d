//! Ordered audio delivery
//!
//! Synthesized chunks finish in whatever order the synthesis engine gets to
//! them, but the caller must hear them in sequence. The emitter dispatches
//! chunks strictly by index, buffering whatever arrives early. Sequence
//! numbering is per-session and tolerates arbitrarily large gaps (a tool
//! round can stall many indices behind a blocked orchestrator).

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;

use call_agent_core::{AckToken, AudioChunk, PlaybackSink, Result};

/// Ordered audio emitter
///
/// Owned by a single task per session; the out-of-order buffer is never
/// shared.
pub struct OrderedAudioEmitter {
    sink: Arc<dyn PlaybackSink>,
    /// Next index due for dispatch
    expected_next: u64,
    /// Chunks that arrived ahead of their turn, keyed by index
    buffered: HashMap<u64, String>,
    /// Acknowledgment tokens for every chunk actually sent
    sent_tx: mpsc::UnboundedSender<AckToken>,
}

impl OrderedAudioEmitter {
    /// Create an emitter writing to the given sink
    pub fn new(sink: Arc<dyn PlaybackSink>, sent_tx: mpsc::UnboundedSender<AckToken>) -> Self {
        Self {
            sink,
            expected_next: 0,
            buffered: HashMap::new(),
            sent_tx,
        }
    }

    /// Submit one chunk for ordered delivery
    ///
    /// Unindexed chunks (announcements) are sent immediately. Indexed chunks
    /// are sent in index order; stale indices are dropped, never resent.
    pub async fn submit(&mut self, chunk: AudioChunk) -> Result<()> {
        match chunk.index {
            None => self.dispatch(&chunk.payload).await,
            Some(index) if index == self.expected_next => {
                self.dispatch(&chunk.payload).await?;
                self.expected_next += 1;
                self.drain_buffer().await
            }
            Some(index) if index > self.expected_next => {
                self.buffered.insert(index, chunk.payload);
                Ok(())
            }
            Some(index) => {
                // Duplicate or superseded chunk
                tracing::warn!(
                    index,
                    expected = self.expected_next,
                    "dropping stale audio chunk"
                );
                Ok(())
            }
        }
    }

    /// Drive the emitter from a chunk channel until the session ends
    pub async fn run(mut self, mut chunks: mpsc::Receiver<AudioChunk>) {
        while let Some(chunk) = chunks.recv().await {
            if let Err(e) = self.submit(chunk).await {
                tracing::warn!("audio dispatch failed: {}", e);
            }
        }
    }

    async fn drain_buffer(&mut self) -> Result<()> {
        while let Some(payload) = self.buffered.remove(&self.expected_next) {
            self.dispatch(&payload).await?;
            self.expected_next += 1;
        }
        Ok(())
    }

    async fn dispatch(&self, payload: &str) -> Result<()> {
        self.sink.send_audio(payload).await?;

        let token = AckToken::generate();
        self.sink.send_mark(token.as_str()).await?;

        // Receiver drop just means the session is tearing down
        let _ = self.sent_tx.send(token);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Sink recording every write in order
    #[derive(Default)]
    struct RecordingSink {
        writes: Mutex<Vec<String>>,
    }

    impl RecordingSink {
        fn payloads(&self) -> Vec<String> {
            self.writes
                .lock()
                .iter()
                .filter(|w| w.starts_with("audio:"))
                .map(|w| w["audio:".len()..].to_string())
                .collect()
        }

        fn mark_count(&self) -> usize {
            self.writes
                .lock()
                .iter()
                .filter(|w| w.starts_with("mark:"))
                .count()
        }
    }

    #[async_trait]
    impl PlaybackSink for RecordingSink {
        async fn send_audio(&self, payload: &str) -> Result<()> {
            self.writes.lock().push(format!("audio:{}", payload));
            Ok(())
        }

        async fn send_mark(&self, label: &str) -> Result<()> {
            self.writes.lock().push(format!("mark:{}", label));
            Ok(())
        }

        async fn clear(&self) -> Result<()> {
            Ok(())
        }
    }

    fn chunk(index: u64, payload: &str) -> AudioChunk {
        AudioChunk {
            index: Some(index),
            payload: payload.to_string(),
        }
    }

    #[tokio::test]
    async fn test_in_order_delivery() {
        let sink = Arc::new(RecordingSink::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut emitter = OrderedAudioEmitter::new(sink.clone(), tx);

        for i in 0..3 {
            emitter.submit(chunk(i, &format!("p{}", i))).await.unwrap();
        }

        assert_eq!(sink.payloads(), vec!["p0", "p1", "p2"]);
    }

    #[tokio::test]
    async fn test_permutation_invariant_ordering() {
        // Submission order 3,0,2,4,1 must still play 0..=4
        let sink = Arc::new(RecordingSink::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut emitter = OrderedAudioEmitter::new(sink.clone(), tx);

        for i in [3u64, 0, 2, 4, 1] {
            emitter.submit(chunk(i, &format!("p{}", i))).await.unwrap();
        }

        assert_eq!(sink.payloads(), vec!["p0", "p1", "p2", "p3", "p4"]);
        assert_eq!(sink.mark_count(), 5);
    }

    #[tokio::test]
    async fn test_unindexed_sent_immediately() {
        let sink = Arc::new(RecordingSink::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut emitter = OrderedAudioEmitter::new(sink.clone(), tx);

        // Index 1 waits for 0, but the announcement jumps the queue
        emitter.submit(chunk(1, "queued")).await.unwrap();
        emitter
            .submit(AudioChunk {
                index: None,
                payload: "announcement".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(sink.payloads(), vec!["announcement"]);
    }

    #[tokio::test]
    async fn test_stale_chunk_dropped() {
        let sink = Arc::new(RecordingSink::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut emitter = OrderedAudioEmitter::new(sink.clone(), tx);

        for i in 0..5 {
            emitter.submit(chunk(i, &format!("p{}", i))).await.unwrap();
        }
        // expected_next is now 5; a resubmission of 2 must not be resent
        emitter.submit(chunk(2, "stale")).await.unwrap();

        assert_eq!(sink.payloads(), vec!["p0", "p1", "p2", "p3", "p4"]);
    }

    #[tokio::test]
    async fn test_large_index_gap_tolerated() {
        let sink = Arc::new(RecordingSink::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut emitter = OrderedAudioEmitter::new(sink.clone(), tx);

        emitter.submit(chunk(0, "p0")).await.unwrap();
        // A tool round skipped many indices
        emitter.submit(chunk(40, "p40")).await.unwrap();
        assert_eq!(sink.payloads(), vec!["p0"]);

        for i in 1..40 {
            emitter.submit(chunk(i, &format!("p{}", i))).await.unwrap();
        }
        let payloads = sink.payloads();
        assert_eq!(payloads.len(), 41);
        assert_eq!(payloads.last().unwrap(), "p40");
    }

    #[tokio::test]
    async fn test_ack_token_per_sent_chunk() {
        let sink = Arc::new(RecordingSink::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut emitter = OrderedAudioEmitter::new(sink.clone(), tx);

        emitter.submit(chunk(0, "p0")).await.unwrap();
        emitter.submit(chunk(1, "p1")).await.unwrap();
        // Buffered chunk produces no token until dispatched
        emitter.submit(chunk(3, "p3")).await.unwrap();

        let mut tokens = Vec::new();
        while let Ok(token) = rx.try_recv() {
            tokens.push(token);
        }
        assert_eq!(tokens.len(), 2);
        assert_ne!(tokens[0], tokens[1]);
    }
}
