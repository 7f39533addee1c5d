//! Transcript assembly from live recognition events
//!
//! The recognizer emits a mix of interim fragments, final fragments, and
//! utterance-end markers. The assembler folds them into two signals: interim
//! utterance text (barge-in detection only) and finalized transcripts
//! (completion requests). Finals without a detected pause accumulate until
//! either a pause-terminated final or an utterance-end event flushes them.

mod live;

pub use live::LiveRecognizer;

use call_agent_core::{RecognitionEvent, RecognitionEventKind, TranscriptSignal};

/// Utterance accumulation state machine
///
/// Holds no cross-utterance memory beyond the single accumulation buffer;
/// the buffer is cleared on every flush.
#[derive(Debug, Default)]
pub struct TranscriptAssembler {
    /// Accumulated final text for the current utterance
    buffer: String,
    /// A pause-terminated final was already flushed for this utterance
    speech_final: bool,
}

impl TranscriptAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one recognition event, possibly yielding a signal
    pub fn consume(&mut self, event: RecognitionEvent) -> Option<TranscriptSignal> {
        if event.kind == RecognitionEventKind::UtteranceEnd {
            if self.speech_final {
                tracing::debug!("utterance end after pause-final, already flushed");
                return None;
            }
            return self.flush();
        }

        let text = event.transcript.as_str();

        if event.is_final && !text.trim().is_empty() {
            self.buffer.push(' ');
            self.buffer.push_str(text);

            if event.speech_final {
                // A pause-terminated final closes the utterance; the flag
                // suppresses a duplicate flush on a later utterance-end.
                self.speech_final = true;
                return self.flush_keeping_flag();
            }

            // More speech expected in the same utterance
            self.speech_final = false;
            return None;
        }

        if !event.is_final {
            return Some(TranscriptSignal::Interim(event.transcript));
        }

        // Final with no speakable content: nothing to forward
        None
    }

    fn flush(&mut self) -> Option<TranscriptSignal> {
        self.speech_final = true;
        self.flush_keeping_flag()
    }

    fn flush_keeping_flag(&mut self) -> Option<TranscriptSignal> {
        let text = std::mem::take(&mut self.buffer);
        let text = text.trim();
        if text.is_empty() {
            None
        } else {
            Some(TranscriptSignal::Final(text.to_string()))
        }
    }
}
