//! Observable session state.
//!
//! [`SessionState`] is the single source of truth the presentation layer
//! renders from. It is mutated only by the session controller; readers get
//! shared references.

use crate::conversation::entities::{Conversation, ConversationId};
use crate::document::WELCOME_DOCUMENT;

/// Process-wide view state (not persisted)
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    conversations: Vec<Conversation>,
    selected_conversation_id: Option<ConversationId>,
    current_content: String,
    is_loading: bool,
    error_message: Option<String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a previously stored collection, nothing selected.
    pub fn with_conversations(conversations: Vec<Conversation>) -> Self {
        Self {
            conversations,
            ..Self::default()
        }
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn selected_conversation_id(&self) -> Option<ConversationId> {
        self.selected_conversation_id
    }

    pub fn current_content(&self) -> &str {
        &self.current_content
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn conversation(&self, id: ConversationId) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id() == id)
    }

    pub fn conversation_mut(&mut self, id: ConversationId) -> Option<&mut Conversation> {
        self.conversations.iter_mut().find(|c| c.id() == id)
    }

    pub fn selected_conversation(&self) -> Option<&Conversation> {
        self.selected_conversation_id
            .and_then(|id| self.conversation(id))
    }

    /// Insert at the front of the list (newest first).
    pub fn insert_front(&mut self, conversation: Conversation) -> ConversationId {
        let id = conversation.id();
        self.conversations.insert(0, conversation);
        id
    }

    /// Select an existing conversation. Unknown ids leave the selection unchanged.
    pub fn select(&mut self, id: ConversationId) -> bool {
        if self.conversation(id).is_none() {
            return false;
        }
        self.selected_conversation_id = Some(id);
        true
    }

    /// Remove a conversation and its messages.
    ///
    /// If it was selected, the first remaining conversation becomes selected,
    /// or the selection is cleared when none remain.
    pub fn remove(&mut self, id: ConversationId) -> Option<Conversation> {
        let index = self.conversations.iter().position(|c| c.id() == id)?;
        let removed = self.conversations.remove(index);
        if self.selected_conversation_id == Some(id) {
            self.selected_conversation_id = self.conversations.first().map(|c| c.id());
        }
        Some(removed)
    }

    /// The document to show for the current selection: the latest HTML of the
    /// selected conversation, or the welcome document when there is none.
    pub fn content_for_selection(&self) -> String {
        match self.selected_conversation() {
            Some(conversation) if !conversation.latest_renderable_content().is_empty() => {
                conversation.latest_renderable_content().to_string()
            }
            _ => WELCOME_DOCUMENT.to_string(),
        }
    }

    pub fn set_current_content(&mut self, content: impl Into<String>) {
        self.current_content = content.into();
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.is_loading = loading;
    }

    pub fn set_error_message(&mut self, message: Option<String>) {
        self.error_message = message;
    }
}
