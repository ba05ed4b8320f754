//! Logging infrastructure: the structured session transcript.
//!
//! Provides [`JsonlTranscriptLogger`], a JSONL file writer that implements
//! the [`TranscriptLogger`](visualizer_application::TranscriptLogger) port.

mod transcript;

pub use transcript::JsonlTranscriptLogger;
