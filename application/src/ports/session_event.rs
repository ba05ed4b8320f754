//! Session events: the output port of the session controller.
//!
//! The controller sends these through an `mpsc::UnboundedSender<SessionEvent>`
//! whenever an observable part of the session state changes. Events carry only
//! what changed; renderers read the details back from the controller's state.

use visualizer_domain::{ConversationId, MessageId};

/// A change to the observable session state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The conversation list changed (insert, delete, rename, reorder).
    ConversationsChanged,
    /// A different conversation is selected, or none.
    SelectionChanged(Option<ConversationId>),
    /// The displayed document was replaced.
    ContentChanged,
    /// A stream started or ended.
    LoadingChanged(bool),
    /// The user-visible error was set or cleared.
    ErrorChanged(Option<String>),
    /// A message's content or streaming flag changed.
    MessageUpdated {
        conversation_id: ConversationId,
        message_id: MessageId,
    },
}
