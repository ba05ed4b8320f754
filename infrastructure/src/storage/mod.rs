//! Conversation persistence.
//!
//! Provides [`JsonFileConversationStore`], which implements the
//! [`ConversationStore`](visualizer_application::ConversationStore) port on top
//! of a single JSON document.

mod json_file;

pub use json_file::{JsonFileConversationStore, STORE_FILE_NAME};
