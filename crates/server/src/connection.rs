//! Media-stream connection wiring
//!
//! Builds the per-call task graph when the telephony leg connects: socket
//! read/write tasks, recognition leg, transcript assembly, completion
//! orchestration, synthesis dispatch, ordered audio emission, and the
//! conversation controller reacting to it all. Everything is joined by
//! typed channels; nothing is shared across calls.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use call_agent_agent::{
    spawn_synthesis_dispatcher, CompletionOrchestrator, ControllerDeps, ConversationController,
};
use call_agent_core::{CallRecorder, SessionEvent};
use call_agent_pipeline::{LiveRecognizer, TranscriptAssembler};
use call_agent_transport::{FrameSink, MediaStreamMessage, OrderedAudioEmitter};

use crate::metrics::{record_call_ended, record_call_started, record_reply_segment, record_transcript};
use crate::recording::HttpCallRecorder;
use crate::session::Session;
use crate::state::AppState;
use crate::transcripts::Speaker;

/// Upgrade the telephony media-stream connection
pub async fn media_stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let session = match state.sessions.create() {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!("rejecting media stream: {}", e);
            return;
        }
    };
    record_call_started();

    if let Err(e) = run_call(socket, state.clone(), session.clone()).await {
        tracing::error!(session_id = %session.id, "call wiring failed: {}", e);
    }

    state.sessions.remove(&session.id);
    record_call_ended();
}

async fn run_call(
    socket: WebSocket,
    state: AppState,
    session: Arc<Session>,
) -> Result<(), crate::ServerError> {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Outbound frames: sink -> channel -> socket
    let (frames_tx, mut frames_rx) = mpsc::unbounded_channel::<String>();
    let sink = Arc::new(FrameSink::new(frames_tx));

    let send_task = tokio::spawn(async move {
        while let Some(json) = frames_rx.recv().await {
            if ws_sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    // Recognition leg
    let (recognizer, mut recognition_events) =
        LiveRecognizer::connect(&state.settings.recognition)
            .await
            .map_err(|e| crate::ServerError::MediaStream(e.to_string()))?;
    let recognizer = Arc::new(recognizer);

    // Typed channels between the per-call components
    let (inbound_tx, inbound_rx) = mpsc::channel::<MediaStreamMessage>(256);
    let (transcripts_tx, transcripts_rx) = mpsc::channel(64);
    let (completions_tx, completions_rx) = mpsc::channel(16);
    let (segments_tx, segments_rx) = mpsc::channel(64);
    let (chunks_tx, chunks_rx) = mpsc::channel(64);
    let (sent_tx, sent_rx) = mpsc::unbounded_channel();
    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<SessionEvent>();

    // Transcript assembly from recognition events
    tokio::spawn(async move {
        let mut assembler = TranscriptAssembler::new();
        while let Some(event) = recognition_events.recv().await {
            if let Some(signal) = assembler.consume(event) {
                if transcripts_tx.send(signal).await.is_err() {
                    break;
                }
            }
        }
    });

    // Completion orchestration
    let orchestrator = CompletionOrchestrator::new(
        state.llm.clone(),
        state.tools.clone(),
        &state.settings.conversation,
        segments_tx.clone(),
    );
    tokio::spawn(orchestrator.run(completions_rx));

    // Synthesis and ordered playback
    spawn_synthesis_dispatcher(
        state.synthesizer.clone(),
        segments_rx,
        chunks_tx,
        events_tx.clone(),
    );
    let emitter = OrderedAudioEmitter::new(sink.clone(), sent_tx);
    tokio::spawn(emitter.run(chunks_rx));

    // Transcript collection
    let transcripts_store = state.transcripts.clone();
    let session_for_events = session.clone();
    tokio::spawn(async move {
        let started = std::time::Instant::now();
        while let Some(event) = events_rx.recv().await {
            session_for_events.touch();
            let call_sid = session_for_events.call_sid();
            match event {
                SessionEvent::CallerTranscript(text) => {
                    record_transcript(started.elapsed().as_secs_f64());
                    transcripts_store.append(&call_sid, Speaker::Caller, text);
                }
                SessionEvent::AgentReply { text, .. } => {
                    record_reply_segment();
                    transcripts_store.append(&call_sid, Speaker::Agent, text);
                }
            }
        }
    });

    // Conversation controller
    let recorder: Option<Arc<dyn CallRecorder>> = if state.settings.telephony.recording_enabled {
        Some(Arc::new(HttpCallRecorder::new(
            state.settings.telephony.clone(),
        )?))
    } else {
        None
    };

    let controller = ConversationController::new(
        state.settings.conversation.clone(),
        state.settings.telephony.clone(),
        ControllerDeps {
            sink,
            recognizer,
            recorder,
            completions_tx,
            segments_tx,
            events_tx,
        },
    );
    let controller_task = tokio::spawn(controller.run(inbound_rx, transcripts_rx, sent_rx));

    // Socket read loop feeds the controller
    while let Some(frame) = ws_receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<MediaStreamMessage>(&text) {
                Ok(message) => {
                    if let MediaStreamMessage::Start { start } = &message {
                        session.set_call_sid(&start.call_sid);
                        state.transcripts.ensure(&start.call_sid);
                    }
                    session.touch();
                    if inbound_tx.send(message).await.is_err() {
                        break;
                    }
                }
                Err(e) => tracing::warn!("unparsable media-stream frame: {}", e),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("media-stream read error: {}", e);
                break;
            }
        }
    }

    // Closing the inbound channel ends the controller loop
    drop(inbound_tx);
    match controller_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!("controller ended with error: {}", e),
        Err(e) => tracing::error!("controller task panicked: {}", e),
    }
    send_task.abort();

    Ok(())
}
