//! Streaming events for completion responses.
//!
//! [`StreamEvent`] represents individual events in a streamed completion,
//! enabling the rendered document to grow while the model is still writing.

/// An event in a streamed completion.
///
/// Bridges transport-level framing (SSE `data:` lines) to the application
/// layer. Failures travel beside these events as typed errors, not as a variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A text fragment from the model (`choices[0].delta.content`).
    Delta(String),
    /// The stream ended normally (`[DONE]` or end of body).
    Completed,
}

impl StreamEvent {
    /// Returns the fragment text if this is a Delta event.
    pub fn text(&self) -> Option<&str> {
        match self {
            StreamEvent::Delta(s) => Some(s),
            StreamEvent::Completed => None,
        }
    }

    /// Returns true if this event signals the end of the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Completed)
    }
}
