//! Conversation store port
//!
//! Loads and saves the whole conversation collection at once.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use visualizer_domain::Conversation;

/// Errors from a conversation store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored conversations are unreadable: {0}")]
    CorruptStore(String),

    #[error("Failed to serialize conversations: {0}")]
    Serialize(String),
}

/// Durable storage for the conversation collection
///
/// `load` on a store that has never been written returns an empty collection.
/// `save` replaces the whole stored collection.
pub trait ConversationStore: Send + Sync {
    fn load(&self) -> Result<Vec<Conversation>, StoreError>;

    fn save(&self, conversations: &[Conversation]) -> Result<(), StoreError>;
}

/// Store kept in process memory, used by tests and `--ephemeral` sessions.
#[derive(Default)]
pub struct InMemoryConversationStore {
    conversations: Mutex<Vec<Conversation>>,
    saves: AtomicUsize,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_conversations(conversations: Vec<Conversation>) -> Self {
        Self {
            conversations: Mutex::new(conversations),
            saves: AtomicUsize::new(0),
        }
    }

    /// Copy of what was last saved (or seeded).
    pub fn snapshot(&self) -> Vec<Conversation> {
        match self.conversations.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Number of `save` calls so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl ConversationStore for InMemoryConversationStore {
    fn load(&self) -> Result<Vec<Conversation>, StoreError> {
        Ok(self.snapshot())
    }

    fn save(&self, conversations: &[Conversation]) -> Result<(), StoreError> {
        let mut guard = match self.conversations.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = conversations.to_vec();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
