//! Session domain.
//!
//! - [`state::SessionState`] — process-wide view state owned by the session controller
//! - [`stream::StreamEvent`] — events of a streamed completion

pub mod state;
pub mod stream;
