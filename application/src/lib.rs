//! Application layer for experiment-visualizer
//!
//! This crate contains the session controller and the port definitions its
//! adapters implement. It depends only on the domain layer.

pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use ports::{
    completion_client::{
        CompletionClient, CompletionError, CompletionRequest, STREAM_CHANNEL_CAPACITY,
        StreamHandle, StreamSender,
    },
    conversation_store::{ConversationStore, InMemoryConversationStore, StoreError},
    session_event::SessionEvent,
    settings_source::{InMemorySettings, SettingsError, SettingsSource, SettingsStore},
    transcript_logger::{NoTranscriptLogger, TranscriptEvent, TranscriptLogger},
};
pub use use_cases::session_controller::{
    SessionController, SessionDependencies, StreamId, StreamUpdate, StreamUpdateKind,
    StreamUpdates,
};
