//! Core traits for pluggable backends
//!
//! The recognition engine, language model, speech synthesizer, playback
//! sink, and call recorder are external collaborators. These traits define
//! the seams the pipeline talks through; concrete implementations live in
//! the pipeline, llm, and transport crates.

mod llm;
mod playback;
mod speech;

pub use llm::LanguageModel;
pub use playback::{CallRecorder, PlaybackSink};
pub use speech::{RecognitionStream, SpeechSynthesizer};
