//! Conversation controller
//!
//! The per-call integration point. Reacts to whichever event arrives next:
//! inbound telephony frames, transcript signals, or sent-audio
//! acknowledgments. Implements the barge-in rule by watching outstanding
//! acknowledgment tokens against interim utterances, and runs the call
//! start flow (call-id context note, optional recording, greeting).

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tokio::sync::mpsc;

use call_agent_config::{ConversationConfig, TelephonyConfig};
use call_agent_core::{
    AckToken, AudioChunk, CallRecorder, PlaybackSink, RecognitionStream, SessionEvent,
    SpeakableSegment, SpeechSynthesizer, TranscriptSignal,
};
use call_agent_transport::{MediaStreamMessage, StartMeta};

use crate::orchestrator::CompletionInput;
use crate::AgentError;

/// Collaborators handed to the controller at call start
pub struct ControllerDeps {
    /// Playback side of the telephony leg
    pub sink: Arc<dyn PlaybackSink>,
    /// Live recognition leg
    pub recognizer: Arc<dyn RecognitionStream>,
    /// Recording starter, present when recording is enabled
    pub recorder: Option<Arc<dyn CallRecorder>>,
    /// Input channel of the orchestrator task
    pub completions_tx: mpsc::Sender<CompletionInput>,
    /// Input channel of the synthesis dispatcher
    pub segments_tx: mpsc::Sender<SpeakableSegment>,
    /// Session notifications for the outer wiring
    pub events_tx: mpsc::UnboundedSender<SessionEvent>,
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Per-call controller state and wiring
pub struct ConversationController {
    conversation: ConversationConfig,
    telephony: TelephonyConfig,
    deps: ControllerDeps,
    /// Acknowledgment tokens for audio currently in flight to the caller
    marks: Vec<AckToken>,
    /// Counts finalized caller utterances
    interaction_count: u32,
    stream_sid: Option<String>,
    call_sid: Option<String>,
}

impl ConversationController {
    pub fn new(
        conversation: ConversationConfig,
        telephony: TelephonyConfig,
        deps: ControllerDeps,
    ) -> Self {
        Self {
            conversation,
            telephony,
            deps,
            marks: Vec::new(),
            interaction_count: 0,
            stream_sid: None,
            call_sid: None,
        }
    }

    /// React to call events until the media stream ends
    pub async fn run(
        mut self,
        mut inbound: mpsc::Receiver<MediaStreamMessage>,
        mut transcripts: mpsc::Receiver<TranscriptSignal>,
        mut sent: mpsc::UnboundedReceiver<AckToken>,
    ) -> Result<(), AgentError> {
        let mut sent_open = true;
        let mut transcripts_open = true;

        loop {
            tokio::select! {
                message = inbound.recv() => match message {
                    Some(message) => {
                        if self.handle_inbound(message).await? == Flow::Stop {
                            break;
                        }
                    }
                    None => break,
                },
                signal = transcripts.recv(), if transcripts_open => match signal {
                    Some(signal) => self.handle_transcript(signal).await?,
                    None => {
                        // Recognition leg dropped; the call itself goes on
                        tracing::warn!("transcript channel closed mid-call");
                        transcripts_open = false;
                    }
                },
                token = sent.recv(), if sent_open => match token {
                    Some(token) => self.handle_sent(token),
                    None => sent_open = false,
                },
            }
        }

        tracing::info!(
            call_sid = self.call_sid.as_deref().unwrap_or("-"),
            stream_sid = self.stream_sid.as_deref().unwrap_or("-"),
            interactions = self.interaction_count,
            "call ended"
        );
        Ok(())
    }

    async fn handle_inbound(&mut self, message: MediaStreamMessage) -> Result<Flow, AgentError> {
        match message {
            MediaStreamMessage::Connected => {}
            MediaStreamMessage::Start { start } => self.handle_start(start).await?,
            MediaStreamMessage::Media { media } => {
                match BASE64.decode(media.payload.as_bytes()) {
                    Ok(audio) => {
                        if let Err(e) = self.deps.recognizer.send_audio(&audio).await {
                            tracing::warn!("recognizer rejected audio: {}", e);
                        }
                    }
                    Err(e) => tracing::warn!("undecodable media payload: {}", e),
                }
            }
            MediaStreamMessage::Mark { mark } => self.handle_mark(&mark.name),
            MediaStreamMessage::Stop => {
                if let Err(e) = self.deps.recognizer.finish().await {
                    tracing::debug!("recognizer already closed: {}", e);
                }
                return Ok(Flow::Stop);
            }
        }
        Ok(Flow::Continue)
    }

    /// Call start: record ids, note the call id for the transfer tool,
    /// optionally start recording, then greet.
    async fn handle_start(&mut self, start: StartMeta) -> Result<(), AgentError> {
        tracing::info!(
            stream_sid = %start.stream_sid,
            call_sid = %start.call_sid,
            "media stream started"
        );

        self.deps.sink.set_stream_id(&start.stream_sid);
        self.stream_sid = Some(start.stream_sid);

        self.send_completion(CompletionInput::SystemNote {
            text: format!("callSid: {}", start.call_sid),
        })
        .await?;

        if self.telephony.recording_enabled {
            self.speak_out_of_band(self.conversation.recording_notice.clone())
                .await?;
            if let Some(recorder) = &self.deps.recorder {
                if let Err(e) = recorder.start(&start.call_sid).await {
                    tracing::error!("failed to start recording: {}", e);
                }
            }
        }
        self.call_sid = Some(start.call_sid);

        self.speak_out_of_band(self.conversation.greeting.clone())
            .await
    }

    async fn handle_transcript(&mut self, signal: TranscriptSignal) -> Result<(), AgentError> {
        match signal {
            TranscriptSignal::Interim(text) => self.handle_interim(&text).await,
            TranscriptSignal::Final(text) => self.handle_final(text).await,
        }
    }

    /// Barge-in rule: audio in flight plus a non-trivial interim utterance
    /// means the caller is interrupting; abandon queued playback.
    async fn handle_interim(&mut self, text: &str) -> Result<(), AgentError> {
        if self.marks.is_empty() {
            return Ok(());
        }
        if text.chars().count() <= self.conversation.min_interrupt_chars {
            return Ok(());
        }

        tracing::info!("caller interruption, clearing playback");
        self.deps
            .sink
            .clear()
            .await
            .map_err(|e| AgentError::Playback(e.to_string()))?;
        Ok(())
    }

    async fn handle_final(&mut self, text: String) -> Result<(), AgentError> {
        if text.trim().is_empty() {
            return Ok(());
        }

        tracing::info!(
            interaction = self.interaction_count,
            "caller transcript: {}",
            text
        );
        let _ = self
            .deps
            .events_tx
            .send(SessionEvent::CallerTranscript(text.clone()));

        self.send_completion(CompletionInput::Transcript {
            text,
            interaction: self.interaction_count,
        })
        .await?;
        self.interaction_count += 1;
        Ok(())
    }

    fn handle_sent(&mut self, token: AckToken) {
        self.marks.push(token);
    }

    /// The telephony leg confirmed playback of the chunk behind this label
    fn handle_mark(&mut self, label: &str) {
        self.marks.retain(|m| m.as_str() != label);
    }

    async fn speak_out_of_band(&self, text: String) -> Result<(), AgentError> {
        self.deps
            .segments_tx
            .send(SpeakableSegment::out_of_band(text, self.interaction_count))
            .await
            .map_err(|_| AgentError::ChannelClosed("segments"))
    }

    async fn send_completion(&self, input: CompletionInput) -> Result<(), AgentError> {
        self.deps
            .completions_tx
            .send(input)
            .await
            .map_err(|_| AgentError::ChannelClosed("completions"))
    }

    #[cfg(test)]
    fn outstanding_marks(&self) -> usize {
        self.marks.len()
    }
}

/// Forward segments to synthesis, one task per segment
///
/// Synthesis latency varies per segment, so completion order is not
/// emission order; the audio emitter downstream restores it from the
/// indices. Each segment is also reported for transcript collection.
pub fn spawn_synthesis_dispatcher(
    synthesizer: Arc<dyn SpeechSynthesizer>,
    mut segments: mpsc::Receiver<SpeakableSegment>,
    chunks_tx: mpsc::Sender<AudioChunk>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(segment) = segments.recv().await {
            let _ = events_tx.send(SessionEvent::AgentReply {
                interaction: segment.interaction,
                text: segment.text.clone(),
            });

            let synthesizer = synthesizer.clone();
            let chunks_tx = chunks_tx.clone();
            tokio::spawn(async move {
                match synthesizer.synthesize(&segment.text).await {
                    Ok(audio) => {
                        let chunk = AudioChunk {
                            index: segment.index,
                            payload: BASE64.encode(audio),
                        };
                        let _ = chunks_tx.send(chunk).await;
                    }
                    Err(e) => {
                        tracing::warn!(index = ?segment.index, "synthesis failed: {}", e);
                    }
                }
            });
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use call_agent_core::Result as CoreResult;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct MockSink {
        clears: AtomicUsize,
        stream_id: Mutex<String>,
    }

    #[async_trait]
    impl PlaybackSink for MockSink {
        async fn send_audio(&self, _payload: &str) -> CoreResult<()> {
            Ok(())
        }
        async fn send_mark(&self, _label: &str) -> CoreResult<()> {
            Ok(())
        }
        async fn clear(&self) -> CoreResult<()> {
            self.clears.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn set_stream_id(&self, stream_id: &str) {
            *self.stream_id.lock() = stream_id.to_string();
        }
    }

    #[derive(Default)]
    struct MockRecognizer {
        frames: Mutex<Vec<Vec<u8>>>,
    }

    #[async_trait]
    impl RecognitionStream for MockRecognizer {
        async fn send_audio(&self, audio: &[u8]) -> CoreResult<()> {
            self.frames.lock().push(audio.to_vec());
            Ok(())
        }
        async fn finish(&self) -> CoreResult<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockRecorder {
        started: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CallRecorder for MockRecorder {
        async fn start(&self, call_id: &str) -> CoreResult<()> {
            self.started.lock().push(call_id.to_string());
            Ok(())
        }
    }

    struct Harness {
        controller: ConversationController,
        sink: Arc<MockSink>,
        recognizer: Arc<MockRecognizer>,
        recorder: Arc<MockRecorder>,
        completions_rx: mpsc::Receiver<CompletionInput>,
        segments_rx: mpsc::Receiver<SpeakableSegment>,
    }

    fn harness(recording_enabled: bool) -> Harness {
        let sink = Arc::new(MockSink::default());
        let recognizer = Arc::new(MockRecognizer::default());
        let recorder = Arc::new(MockRecorder::default());
        let (completions_tx, completions_rx) = mpsc::channel(16);
        let (segments_tx, segments_rx) = mpsc::channel(16);
        let (events_tx, _events_rx) = mpsc::unbounded_channel();

        let telephony = TelephonyConfig {
            recording_enabled,
            api_base: "https://api.telephony.example".to_string(),
            ..Default::default()
        };

        let controller = ConversationController::new(
            ConversationConfig::default(),
            telephony,
            ControllerDeps {
                sink: sink.clone(),
                recognizer: recognizer.clone(),
                recorder: Some(recorder.clone()),
                completions_tx,
                segments_tx,
                events_tx,
            },
        );

        Harness {
            controller,
            sink,
            recognizer,
            recorder,
            completions_rx,
            segments_rx,
        }
    }

    #[tokio::test]
    async fn test_barge_in_with_outstanding_audio() {
        let mut h = harness(false);

        // Two chunks in flight
        h.controller.handle_sent(AckToken::generate());
        h.controller.handle_sent(AckToken::generate());

        // Interim of length 12 exceeds the noise threshold
        h.controller.handle_interim("wait one sec").await.unwrap();
        assert_eq!(h.sink.clears.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_barge_in_without_outstanding_audio() {
        let mut h = harness(false);

        h.controller
            .handle_interim("a very long interruption indeed")
            .await
            .unwrap();
        assert_eq!(h.sink.clears.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_short_interim_is_noise() {
        let mut h = harness(false);
        h.controller.handle_sent(AckToken::generate());

        // At the threshold, not above it
        h.controller.handle_interim("uh ok").await.unwrap();
        assert_eq!(h.sink.clears.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_mark_confirmation_releases_token() {
        let mut h = harness(false);

        let token = AckToken::generate();
        h.controller.handle_sent(token.clone());
        h.controller.handle_sent(AckToken::generate());
        assert_eq!(h.controller.outstanding_marks(), 2);

        h.controller.handle_mark(token.as_str());
        assert_eq!(h.controller.outstanding_marks(), 1);
    }

    #[tokio::test]
    async fn test_final_transcript_forwards_and_counts() {
        let mut h = harness(false);

        h.controller
            .handle_final("I'd like dental coverage".to_string())
            .await
            .unwrap();
        h.controller
            .handle_final("the basic one".to_string())
            .await
            .unwrap();

        match h.completions_rx.try_recv().unwrap() {
            CompletionInput::Transcript { text, interaction } => {
                assert_eq!(text, "I'd like dental coverage");
                assert_eq!(interaction, 0);
            }
            other => panic!("unexpected input: {:?}", other),
        }
        match h.completions_rx.try_recv().unwrap() {
            CompletionInput::Transcript { interaction, .. } => assert_eq!(interaction, 1),
            other => panic!("unexpected input: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_final_dropped() {
        let mut h = harness(false);
        h.controller.handle_final("   ".to_string()).await.unwrap();
        assert!(h.completions_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_start_flow_with_recording() {
        let mut h = harness(true);

        h.controller
            .handle_start(StartMeta {
                stream_sid: "MZ1".to_string(),
                call_sid: "CA1".to_string(),
            })
            .await
            .unwrap();

        // Stream id propagated to the sink
        assert_eq!(*h.sink.stream_id.lock(), "MZ1");

        // Call id noted for the transfer tool
        match h.completions_rx.try_recv().unwrap() {
            CompletionInput::SystemNote { text } => assert_eq!(text, "callSid: CA1"),
            other => panic!("unexpected input: {:?}", other),
        }

        // Recording announced, then started
        let notice = h.segments_rx.try_recv().unwrap();
        assert_eq!(notice.index, None);
        assert_eq!(notice.text, ConversationConfig::default().recording_notice);
        assert_eq!(h.recorder.started.lock().clone(), vec!["CA1".to_string()]);

        // Greeting spoken out of band
        let greeting = h.segments_rx.try_recv().unwrap();
        assert_eq!(greeting.index, None);
        assert_eq!(greeting.text, ConversationConfig::default().greeting);
    }

    #[tokio::test]
    async fn test_media_decoded_and_forwarded() {
        let mut h = harness(false);

        let payload = BASE64.encode(b"raw-ulaw-bytes");
        let flow = h
            .controller
            .handle_inbound(MediaStreamMessage::Media {
                media: call_agent_transport::MediaPayload { payload },
            })
            .await
            .unwrap();

        assert_eq!(flow, Flow::Continue);
        assert_eq!(
            h.recognizer.frames.lock().clone(),
            vec![b"raw-ulaw-bytes".to_vec()]
        );
    }

    #[tokio::test]
    async fn test_stop_ends_flow() {
        let mut h = harness(false);
        let flow = h
            .controller
            .handle_inbound(MediaStreamMessage::Stop)
            .await
            .unwrap();
        assert_eq!(flow, Flow::Stop);
    }

    #[tokio::test]
    async fn test_synthesis_dispatcher_tags_chunks() {
        struct EchoSynth;

        #[async_trait]
        impl SpeechSynthesizer for EchoSynth {
            async fn synthesize(&self, text: &str) -> CoreResult<Vec<u8>> {
                Ok(text.as_bytes().to_vec())
            }
            fn engine_name(&self) -> &str {
                "echo"
            }
        }

        let (segments_tx, segments_rx) = mpsc::channel(8);
        let (chunks_tx, mut chunks_rx) = mpsc::channel(8);
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();

        let handle = spawn_synthesis_dispatcher(
            Arc::new(EchoSynth),
            segments_rx,
            chunks_tx,
            events_tx,
        );

        segments_tx
            .send(SpeakableSegment::sequenced(4, "speak this", 1))
            .await
            .unwrap();
        drop(segments_tx);

        let chunk = chunks_rx.recv().await.unwrap();
        assert_eq!(chunk.index, Some(4));
        assert_eq!(BASE64.decode(chunk.payload).unwrap(), b"speak this");

        match events_rx.recv().await.unwrap() {
            SessionEvent::AgentReply { interaction, text } => {
                assert_eq!(interaction, 1);
                assert_eq!(text, "speak this");
            }
            other => panic!("unexpected event: {:?}", other),
        }

        handle.await.unwrap();
    }
}
