//! Conversation domain.
//!
//! - [`entities::Conversation`] — an ordered transcript owning its messages
//! - [`entities::Message`] — a prompt or a (possibly streaming) HTML response

pub mod entities;
