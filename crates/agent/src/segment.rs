//! Reply segmentation for streaming completions
//!
//! The model marks natural pauses with a designated marker character, and
//! the segmenter cuts its streamed output at those marks so synthesis can
//! start on early segments while later text is still generating. Indices
//! are monotonic per session: they define the playback order the audio
//! emitter reconstructs downstream.

use call_agent_core::SpeakableSegment;

/// Splits streamed text into speakable segments at pause markers
#[derive(Debug)]
pub struct ReplySegmenter {
    marker: char,
    /// Text accumulated since the last emitted segment
    buffer: String,
    /// Next sequence index; never reset within a session
    next_index: u64,
}

impl ReplySegmenter {
    /// Create a segmenter cutting at the given marker
    pub fn new(marker: char) -> Self {
        Self {
            marker,
            buffer: String::new(),
            next_index: 0,
        }
    }

    /// Append a streamed delta, emitting any now-complete segments
    pub fn push(&mut self, delta: &str, interaction: u32) -> Vec<SpeakableSegment> {
        self.buffer.push_str(delta);

        let mut segments = Vec::new();
        while let Some(position) = self.buffer.find(self.marker) {
            let span: String = self.buffer.drain(..=position).collect();
            // The marker bounds the segment; it is not speakable content
            let text = span.trim_end_matches(self.marker).trim();
            if !text.is_empty() {
                segments.push(SpeakableSegment::sequenced(
                    self.next_index,
                    text,
                    interaction,
                ));
                self.next_index += 1;
            }
        }

        segments
    }

    /// Emit whatever remains at end of stream
    pub fn flush(&mut self, interaction: u32) -> Option<SpeakableSegment> {
        let text = std::mem::take(&mut self.buffer);
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let segment = SpeakableSegment::sequenced(self.next_index, text, interaction);
        self.next_index += 1;
        Some(segment)
    }

    /// The index the next segment will carry
    pub fn next_index(&self) -> u64 {
        self.next_index
    }
}
