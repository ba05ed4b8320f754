//! Domain layer for experiment-visualizer
//!
//! This crate contains the core entities and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! - **Conversation**: an ordered transcript of prompts and generated HTML documents
//! - **Session state**: what the presentation layer renders (`current_content`,
//!   loading flag, error message, conversation list and selection)
//! - **Settings**: the credential and model read before each request

pub mod conversation;
pub mod document;
pub mod prompt;
pub mod session;
pub mod settings;
pub mod util;

// Re-export commonly used types
pub use conversation::entities::{
    ContentKind, Conversation, ConversationId, Message, MessageId, NEW_CONVERSATION_TITLE, Role,
    WELCOME_TITLE,
};
pub use document::{WELCOME_DOCUMENT, error_document};
pub use prompt::PromptTemplate;
pub use session::{state::SessionState, stream::StreamEvent};
pub use settings::{AVAILABLE_MODELS, DEFAULT_MODEL, Settings, model_display_name};
