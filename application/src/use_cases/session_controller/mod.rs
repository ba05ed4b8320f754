//! Session Controller
//!
//! Owns the [`SessionState`] and every mutation of it: conversation
//! selection, creation and deletion, sending prompts, applying streamed
//! fragments, and cancellation. Emits [`SessionEvent`]s to a channel for the
//! presentation layer to render.
//!
//! Streams are consumed on background tasks that never touch the state. They
//! report through [`StreamUpdates`], and the owner of the controller feeds each
//! update back with [`SessionController::apply_stream_update`]. At most one
//! stream is active; starting a new one or cancelling abandons the previous
//! one, and anything it still produces is dropped.

mod stream;

pub use stream::{StreamId, StreamUpdate, StreamUpdateKind, StreamUpdates};

use crate::ports::completion_client::{CompletionClient, CompletionError, CompletionRequest};
use crate::ports::conversation_store::{ConversationStore, StoreError};
use crate::ports::session_event::SessionEvent;
use crate::ports::settings_source::SettingsSource;
use crate::ports::transcript_logger::{NoTranscriptLogger, TranscriptEvent, TranscriptLogger};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use stream::consume_stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use visualizer_domain::util::preview;
use visualizer_domain::{
    Conversation, ConversationId, Message, MessageId, NEW_CONVERSATION_TITLE, SessionState,
    error_document,
};

/// Adapters the controller works against
pub struct SessionDependencies {
    pub completion_client: Arc<dyn CompletionClient>,
    pub settings: Arc<dyn SettingsSource>,
    pub store: Arc<dyn ConversationStore>,
}

/// The one stream allowed to mutate the session
struct ActiveStream {
    id: StreamId,
    conversation_id: ConversationId,
    message_id: MessageId,
    cancellation: CancellationToken,
    /// Concatenation of every fragment applied so far
    buffer: String,
}

/// Session controller managing conversations and the active stream
pub struct SessionController {
    state: SessionState,
    completion_client: Arc<dyn CompletionClient>,
    settings: Arc<dyn SettingsSource>,
    store: Arc<dyn ConversationStore>,
    transcript: Arc<dyn TranscriptLogger>,
    /// Channel sender for session events
    tx: mpsc::UnboundedSender<SessionEvent>,
    /// Cloned into each stream task
    update_tx: mpsc::UnboundedSender<StreamUpdate>,
    active: Option<ActiveStream>,
    next_stream_id: u64,
}

impl SessionController {
    /// Create a controller and load the stored conversations.
    ///
    /// Returns the receiving side of the stream updates; the caller must
    /// pass each received update to [`apply_stream_update`](Self::apply_stream_update).
    pub fn new(
        deps: SessionDependencies,
        tx: mpsc::UnboundedSender<SessionEvent>,
    ) -> (Self, StreamUpdates) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let state = bootstrap(deps.store.as_ref());

        let controller = Self {
            state,
            completion_client: deps.completion_client,
            settings: deps.settings,
            store: deps.store,
            transcript: Arc::new(NoTranscriptLogger),
            tx,
            update_tx,
            active: None,
            next_stream_id: 1,
        };
        (controller, StreamUpdates::new(update_rx))
    }

    pub fn with_transcript_logger(mut self, logger: Arc<dyn TranscriptLogger>) -> Self {
        self.transcript = logger;
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_streaming(&self) -> bool {
        self.active.is_some()
    }

    /// Conversation receiving the active stream, if any.
    pub fn streaming_conversation_id(&self) -> Option<ConversationId> {
        self.active.as_ref().map(|a| a.conversation_id)
    }

    /// Size in bytes of what the active stream has produced so far.
    pub fn streamed_bytes(&self) -> usize {
        self.active.as_ref().map_or(0, |a| a.buffer.len())
    }

    /// Select a conversation and show its latest document.
    ///
    /// Unknown ids are ignored and leave the selection unchanged.
    pub fn select_conversation(&mut self, id: ConversationId) -> bool {
        if !self.state.select(id) {
            debug!("Ignoring selection of unknown conversation {}", id);
            return false;
        }
        self.refresh_content_for_selection();
        self.emit(SessionEvent::SelectionChanged(Some(id)));
        self.emit(SessionEvent::ContentChanged);
        true
    }

    /// Insert a new empty conversation at the front and select it.
    pub fn create_conversation(&mut self, title: &str) -> ConversationId {
        let title = match title.trim() {
            "" => NEW_CONVERSATION_TITLE,
            trimmed => trimmed,
        };
        let id = self.state.insert_front(Conversation::new(title));
        self.state.select(id);
        self.refresh_content_for_selection();
        self.persist();

        info!("Created conversation {} ({})", id, preview(title, 40));
        self.transcript.log(TranscriptEvent::new(
            "conversation_created",
            json!({ "conversation_id": id.to_string(), "title": title }),
        ));
        self.emit(SessionEvent::ConversationsChanged);
        self.emit(SessionEvent::SelectionChanged(Some(id)));
        self.emit(SessionEvent::ContentChanged);
        id
    }

    /// Delete a conversation and all of its messages.
    ///
    /// A stream writing into the deleted conversation is cancelled first. If
    /// the deleted conversation was selected, the first remaining one is
    /// selected instead, or nothing when the list is now empty.
    pub fn delete_conversation(&mut self, id: ConversationId) -> bool {
        if self.state.conversation(id).is_none() {
            return false;
        }
        if self.streaming_conversation_id() == Some(id) && self.cancel_active() {
            self.emit(SessionEvent::LoadingChanged(false));
        }

        let was_selected = self.state.selected_conversation_id() == Some(id);
        self.state.remove(id);
        if was_selected {
            self.refresh_content_for_selection();
        }
        self.persist();

        info!("Deleted conversation {}", id);
        self.transcript.log(TranscriptEvent::new(
            "conversation_deleted",
            json!({ "conversation_id": id.to_string() }),
        ));
        self.emit(SessionEvent::ConversationsChanged);
        if was_selected {
            self.emit(SessionEvent::SelectionChanged(
                self.state.selected_conversation_id(),
            ));
            self.emit(SessionEvent::ContentChanged);
        }
        true
    }

    /// Send a prompt and start streaming its document.
    ///
    /// Empty prompts are ignored. Any active stream is abandoned first. The
    /// settings are read now, so the credential and model in effect at this
    /// moment are the ones used.
    pub fn send_message(&mut self, prompt: &str) -> Option<StreamId> {
        if prompt.is_empty() {
            return None;
        }
        if self.cancel_active() {
            debug!("New prompt supersedes the active stream");
        }
        if self.state.error_message().is_some() {
            self.state.set_error_message(None);
            self.emit(SessionEvent::ErrorChanged(None));
        }

        let conversation_id = self.resolve_target(prompt);
        let Some(conversation) = self.state.conversation_mut(conversation_id) else {
            warn!("Target conversation {} vanished", conversation_id);
            return None;
        };
        conversation.push_message(Message::user_text(conversation_id, prompt));
        let message_id = conversation.push_message(Message::assistant_placeholder(conversation_id));

        self.state.set_loading(true);
        self.state.set_current_content(String::new());

        let settings = self.settings.settings();
        let request = CompletionRequest::new(prompt, &settings);
        let stream_id = StreamId(self.next_stream_id);
        self.next_stream_id += 1;
        let cancellation = CancellationToken::new();

        info!(
            "Sending {} to {} ({})",
            stream_id,
            request.model,
            preview(prompt, 60)
        );
        self.transcript.log(TranscriptEvent::new(
            "prompt_sent",
            json!({
                "conversation_id": conversation_id.to_string(),
                "model": request.model,
                "prompt": prompt,
            }),
        ));

        tokio::spawn(consume_stream(
            self.completion_client.clone(),
            request,
            cancellation.clone(),
            stream_id,
            self.update_tx.clone(),
        ));
        self.active = Some(ActiveStream {
            id: stream_id,
            conversation_id,
            message_id,
            cancellation,
            buffer: String::new(),
        });

        self.emit(SessionEvent::ConversationsChanged);
        self.emit(SessionEvent::MessageUpdated {
            conversation_id,
            message_id,
        });
        self.emit(SessionEvent::LoadingChanged(true));
        self.emit(SessionEvent::ContentChanged);
        Some(stream_id)
    }

    /// Abandon the active stream.
    ///
    /// The assistant message keeps whatever content it had, stops streaming,
    /// and nothing later from that stream is applied. The error message is
    /// left as it is and nothing is persisted. Returns false when no stream
    /// was active.
    pub fn cancel_streaming(&mut self) -> bool {
        if !self.cancel_active() {
            return false;
        }
        self.emit(SessionEvent::LoadingChanged(false));
        true
    }

    /// Apply one update produced by a stream task.
    ///
    /// Updates from a stream that is no longer active are dropped.
    pub fn apply_stream_update(&mut self, update: StreamUpdate) {
        let is_active = self
            .active
            .as_ref()
            .is_some_and(|a| a.id == update.stream_id && !a.cancellation.is_cancelled());
        if !is_active {
            debug!("Dropping update from inactive {}", update.stream_id);
            return;
        }

        match update.kind {
            StreamUpdateKind::Fragment(fragment) => self.apply_fragment(&fragment),
            StreamUpdateKind::Finished => self.finish_active(),
            StreamUpdateKind::Failed(error) => self.fail_active(error),
        }
    }

    /// Apply updates until no stream is active.
    pub async fn drive_until_idle(&mut self, updates: &mut StreamUpdates) {
        while self.active.is_some() {
            match updates.recv().await {
                Some(update) => self.apply_stream_update(update),
                None => break,
            }
        }
    }

    fn apply_fragment(&mut self, fragment: &str) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        active.buffer.push_str(fragment);
        let conversation_id = active.conversation_id;
        let message_id = active.message_id;
        let content = active.buffer.clone();

        if let Some(message) = self
            .state
            .conversation_mut(conversation_id)
            .and_then(|c| c.message_mut(message_id))
        {
            message.update_streaming_content(&content);
        }
        let shows_stream = self.state.selected_conversation_id() == Some(conversation_id);
        if shows_stream {
            self.state.set_current_content(content);
        }

        self.emit(SessionEvent::MessageUpdated {
            conversation_id,
            message_id,
        });
        if shows_stream {
            self.emit(SessionEvent::ContentChanged);
        }
    }

    fn finish_active(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        if let Some(message) = self
            .state
            .conversation_mut(active.conversation_id)
            .and_then(|c| c.message_mut(active.message_id))
        {
            message.finish(active.buffer.clone());
        }
        self.state.set_loading(false);
        let shows_stream = self.state.selected_conversation_id() == Some(active.conversation_id);
        if shows_stream {
            self.state.set_current_content(active.buffer.clone());
        }
        self.persist();

        info!("{} completed ({} bytes)", active.id, active.buffer.len());
        self.transcript.log(TranscriptEvent::new(
            "stream_completed",
            json!({
                "conversation_id": active.conversation_id.to_string(),
                "bytes": active.buffer.len(),
                "content": active.buffer,
            }),
        ));
        self.emit(SessionEvent::MessageUpdated {
            conversation_id: active.conversation_id,
            message_id: active.message_id,
        });
        self.emit(SessionEvent::LoadingChanged(false));
        if shows_stream {
            self.emit(SessionEvent::ContentChanged);
        }
    }

    fn fail_active(&mut self, error: CompletionError) {
        let Some(active) = self.active.take() else {
            return;
        };
        let description = error.to_string();
        let document = error_document(&description);

        if let Some(message) = self
            .state
            .conversation_mut(active.conversation_id)
            .and_then(|c| c.message_mut(active.message_id))
        {
            message.finish(document.clone());
        }
        self.state.set_error_message(Some(description.clone()));
        self.state.set_loading(false);
        let shows_stream = self.state.selected_conversation_id() == Some(active.conversation_id);
        if shows_stream {
            self.state.set_current_content(document);
        }
        self.persist();

        warn!("{} failed: {}", active.id, description);
        self.transcript.log(TranscriptEvent::new(
            "stream_failed",
            json!({
                "conversation_id": active.conversation_id.to_string(),
                "error": description,
            }),
        ));
        self.emit(SessionEvent::MessageUpdated {
            conversation_id: active.conversation_id,
            message_id: active.message_id,
        });
        self.emit(SessionEvent::ErrorChanged(Some(description)));
        self.emit(SessionEvent::LoadingChanged(false));
        if shows_stream {
            self.emit(SessionEvent::ContentChanged);
        }
    }

    /// Cancel the active stream and freeze its message. Returns false when idle.
    fn cancel_active(&mut self) -> bool {
        let Some(active) = self.active.take() else {
            return false;
        };
        active.cancellation.cancel();
        if let Some(message) = self
            .state
            .conversation_mut(active.conversation_id)
            .and_then(|c| c.message_mut(active.message_id))
        {
            message.abandon();
        }
        self.state.set_loading(false);

        info!("{} cancelled after {} bytes", active.id, active.buffer.len());
        self.transcript.log(TranscriptEvent::new(
            "stream_cancelled",
            json!({
                "conversation_id": active.conversation_id.to_string(),
                "bytes": active.buffer.len(),
            }),
        ));
        self.emit(SessionEvent::MessageUpdated {
            conversation_id: active.conversation_id,
            message_id: active.message_id,
        });
        true
    }

    /// The selected conversation, renamed if it is the welcome placeholder,
    /// or a new conversation titled after the prompt when nothing is selected.
    fn resolve_target(&mut self, prompt: &str) -> ConversationId {
        if let Some(conversation) = self
            .state
            .selected_conversation_id()
            .and_then(|id| self.state.conversation_mut(id))
        {
            if conversation.is_welcome_placeholder() {
                conversation.rename(prompt);
            }
            return conversation.id();
        }

        let id = self.state.insert_front(Conversation::new(prompt));
        self.state.select(id);
        debug!("Opened conversation {} for the prompt", id);
        self.emit(SessionEvent::SelectionChanged(Some(id)));
        id
    }

    fn refresh_content_for_selection(&mut self) {
        let content = self.state.content_for_selection();
        self.state.set_current_content(content);
    }

    fn persist(&self) {
        if let Err(e) = self.store.save(self.state.conversations()) {
            warn!("Failed to save conversations: {}", e);
        }
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Some(active) = &self.active {
            active.cancellation.cancel();
        }
    }
}

/// Build the initial state from the store.
///
/// An unreadable store starts an empty session. When there is nothing to
/// show, an unsaved welcome conversation is inserted and selected.
fn bootstrap(store: &dyn ConversationStore) -> SessionState {
    let mut conversations = match store.load() {
        Ok(conversations) => conversations,
        Err(StoreError::CorruptStore(detail)) => {
            warn!("Stored conversations are unreadable, starting empty: {}", detail);
            Vec::new()
        }
        Err(e) => {
            warn!("Failed to load conversations, starting empty: {}", e);
            Vec::new()
        }
    };

    let mut seen = HashSet::new();
    conversations.retain(|c| seen.insert(c.id()));
    let repaired: usize = conversations
        .iter_mut()
        .map(Conversation::normalize_loaded)
        .sum();
    if repaired > 0 {
        info!("Cleared the streaming flag on {} interrupted message(s)", repaired);
    }

    let mut state = SessionState::with_conversations(conversations);
    let selected = match state.conversations().first() {
        Some(first) => first.id(),
        None => state.insert_front(Conversation::welcome()),
    };
    state.select(selected);
    let content = state.content_for_selection();
    state.set_current_content(content);
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::completion_client::{StreamHandle, StreamSender};
    use crate::ports::conversation_store::InMemoryConversationStore;
    use crate::ports::settings_source::{InMemorySettings, SettingsStore};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::timeout;
    use visualizer_domain::{Role, Settings, StreamEvent, WELCOME_DOCUMENT, WELCOME_TITLE};

    // ==================== Mock Implementations ====================

    type ManualSlot = Arc<Mutex<Option<StreamSender>>>;

    enum Script {
        Fragments(Vec<&'static str>),
        Fail(CompletionError),
        /// The test feeds the stream itself through the sender left in the slot.
        Manual(ManualSlot),
    }

    #[derive(Default)]
    struct ScriptedClient {
        scripts: Mutex<VecDeque<Script>>,
        calls: AtomicUsize,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedClient {
        fn new(scripts: Vec<Script>) -> Self {
            Self {
                scripts: Mutex::new(scripts.into()),
                ..Self::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        async fn stream_completion(
            &self,
            request: CompletionRequest,
            cancellation: CancellationToken,
        ) -> Result<StreamHandle, CompletionError> {
            request.ensure_credential()?;
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request);

            let script = self
                .scripts
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Script::Fragments(Vec::new()));
            let (tx, handle) = StreamHandle::channel(cancellation);
            match script {
                Script::Fragments(parts) => {
                    for part in parts {
                        tx.send(Ok(StreamEvent::Delta(part.to_string())))
                            .await
                            .unwrap();
                    }
                    tx.send(Ok(StreamEvent::Completed)).await.unwrap();
                }
                Script::Fail(error) => {
                    tx.send(Err(error)).await.unwrap();
                }
                Script::Manual(slot) => {
                    *slot.lock().unwrap() = Some(tx);
                }
            }
            Ok(handle)
        }
    }

    /// Store whose file could not be parsed.
    struct CorruptStore;

    impl ConversationStore for CorruptStore {
        fn load(&self) -> Result<Vec<Conversation>, StoreError> {
            Err(StoreError::CorruptStore("expected value at line 1".to_string()))
        }

        fn save(&self, _conversations: &[Conversation]) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingLogger {
        events: Mutex<Vec<&'static str>>,
    }

    impl TranscriptLogger for RecordingLogger {
        fn log(&self, event: TranscriptEvent) {
            self.events.lock().unwrap().push(event.event_type);
        }
    }

    // ==================== Helpers ====================

    struct Harness {
        controller: SessionController,
        updates: StreamUpdates,
        events: mpsc::UnboundedReceiver<SessionEvent>,
        store: Arc<InMemoryConversationStore>,
        client: Arc<ScriptedClient>,
        settings: Arc<InMemorySettings>,
    }

    fn harness_with(
        scripts: Vec<Script>,
        store: InMemoryConversationStore,
        api_key: &str,
    ) -> Harness {
        let store = Arc::new(store);
        let client = Arc::new(ScriptedClient::new(scripts));
        let settings = Arc::new(InMemorySettings::with_api_key(api_key));
        let (tx, events) = mpsc::unbounded_channel();
        let (controller, updates) = SessionController::new(
            SessionDependencies {
                completion_client: client.clone(),
                settings: settings.clone(),
                store: store.clone(),
            },
            tx,
        );
        Harness {
            controller,
            updates,
            events,
            store,
            client,
            settings,
        }
    }

    fn harness(scripts: Vec<Script>) -> Harness {
        harness_with(scripts, InMemoryConversationStore::new(), "sk-or-test")
    }

    fn manual() -> (Script, ManualSlot) {
        let slot: ManualSlot = Arc::new(Mutex::new(None));
        (Script::Manual(slot.clone()), slot)
    }

    async fn sender_from(slot: &ManualSlot) -> StreamSender {
        for _ in 0..100 {
            if let Some(tx) = slot.lock().unwrap().clone() {
                return tx;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("stream was never opened");
    }

    async fn feed(h: &mut Harness, tx: &StreamSender, fragment: &str) {
        tx.send(Ok(StreamEvent::Delta(fragment.to_string())))
            .await
            .unwrap();
        let update = timeout(Duration::from_secs(5), h.updates.recv())
            .await
            .expect("timed out waiting for update")
            .expect("update channel closed");
        h.controller.apply_stream_update(update);
    }

    async fn drive(h: &mut Harness) {
        timeout(
            Duration::from_secs(5),
            h.controller.drive_until_idle(&mut h.updates),
        )
        .await
        .expect("stream never finished");
    }

    fn drain_events(h: &mut Harness) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = h.events.try_recv() {
            events.push(event);
        }
        events
    }

    fn selected(h: &Harness) -> &Conversation {
        h.controller.state().selected_conversation().unwrap()
    }

    fn streaming_count(h: &Harness) -> usize {
        h.controller
            .state()
            .conversations()
            .iter()
            .flat_map(|c| c.messages())
            .filter(|m| m.is_streaming())
            .count()
    }

    // ==================== Bootstrap ====================

    #[tokio::test]
    async fn empty_store_starts_with_unsaved_welcome() {
        let h = harness(vec![]);
        let state = h.controller.state();

        assert_eq!(state.conversations().len(), 1);
        assert_eq!(selected(&h).title(), WELCOME_TITLE);
        assert_eq!(state.current_content(), WELCOME_DOCUMENT);
        assert!(!state.is_loading());
        assert_eq!(state.error_message(), None);
        assert_eq!(h.store.save_count(), 0);
    }

    #[tokio::test]
    async fn stored_conversations_select_first_and_clear_streaming_flags() {
        let mut first = Conversation::new("Pendulum");
        first.push_message(Message::user_text(first.id(), "Pendulum"));
        let message_id = first.push_message(Message::assistant_placeholder(first.id()));
        let second = Conversation::new("Optics");
        let store = InMemoryConversationStore::with_conversations(vec![first.clone(), second]);

        let h = harness_with(vec![], store, "sk");
        let state = h.controller.state();

        assert_eq!(state.conversations().len(), 2);
        assert_eq!(state.selected_conversation_id(), Some(first.id()));
        let message = selected(&h).message(message_id).unwrap();
        assert!(!message.is_streaming());
        assert_eq!(streaming_count(&h), 0);
    }

    #[tokio::test]
    async fn corrupt_store_starts_empty() {
        let (tx, _events) = mpsc::unbounded_channel();
        let (controller, _updates) = SessionController::new(
            SessionDependencies {
                completion_client: Arc::new(ScriptedClient::default()),
                settings: Arc::new(InMemorySettings::default()),
                store: Arc::new(CorruptStore),
            },
            tx,
        );

        let state = controller.state();
        assert_eq!(state.conversations().len(), 1);
        assert!(state.conversations()[0].is_welcome_placeholder());
        assert_eq!(state.current_content(), WELCOME_DOCUMENT);
    }

    // ==================== Sending ====================

    #[tokio::test]
    async fn send_streams_document_into_renamed_welcome() {
        let mut h = harness(vec![Script::Fragments(vec!["<div>", "hi", "</div>"])]);

        let stream_id = h.controller.send_message("Explain gravity");
        assert!(stream_id.is_some());
        assert!(h.controller.state().is_loading());
        assert_eq!(h.controller.state().current_content(), "");
        assert_eq!(selected(&h).title(), "Explain gravity");

        drive(&mut h).await;

        let state = h.controller.state();
        let conversation = selected(&h);
        assert_eq!(conversation.messages().len(), 2);
        assert_eq!(conversation.messages()[0].role(), Role::User);
        assert_eq!(conversation.messages()[0].content(), "Explain gravity");
        let reply = &conversation.messages()[1];
        assert_eq!(reply.role(), Role::Assistant);
        assert_eq!(reply.content(), "<div>hi</div>");
        assert!(!reply.is_streaming());
        assert_eq!(state.current_content(), "<div>hi</div>");
        assert!(!state.is_loading());
        assert_eq!(state.error_message(), None);

        let saved = h.store.snapshot();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].title(), "Explain gravity");
        assert_eq!(saved[0].messages()[1].content(), "<div>hi</div>");
    }

    #[tokio::test]
    async fn final_document_does_not_depend_on_chunking() {
        let mut coarse = harness(vec![Script::Fragments(vec!["<p>ab", "c</p>"])]);
        let mut fine = harness(vec![Script::Fragments(vec![
            "<", "p>", "a", "b", "c", "<", "/p>",
        ])]);

        coarse.controller.send_message("letters");
        fine.controller.send_message("letters");
        drive(&mut coarse).await;
        drive(&mut fine).await;

        assert_eq!(coarse.controller.state().current_content(), "<p>abc</p>");
        assert_eq!(
            fine.controller.state().current_content(),
            coarse.controller.state().current_content()
        );
    }

    #[tokio::test]
    async fn fragments_show_accumulated_content_while_streaming() {
        let (script, slot) = manual();
        let mut h = harness(vec![script]);
        h.controller.send_message("gravity");
        let tx = sender_from(&slot).await;

        feed(&mut h, &tx, "<div>").await;
        assert_eq!(h.controller.state().current_content(), "<div>");
        assert!(h.controller.state().is_loading());
        let reply = selected(&h).last_assistant_message().unwrap();
        assert!(reply.is_streaming());
        assert_eq!(reply.content(), "<div>");

        feed(&mut h, &tx, "hi").await;
        assert_eq!(h.controller.state().current_content(), "<div>hi");
        assert_eq!(h.controller.streamed_bytes(), "<div>hi".len());

        tx.send(Ok(StreamEvent::Completed)).await.unwrap();
        drive(&mut h).await;
        assert_eq!(h.controller.state().current_content(), "<div>hi");
        assert!(!h.controller.is_streaming());
    }

    #[tokio::test]
    async fn empty_prompt_is_ignored() {
        let mut h = harness(vec![]);
        assert_eq!(h.controller.send_message(""), None);

        assert!(selected(&h).messages().is_empty());
        assert!(!h.controller.state().is_loading());
        drive(&mut h).await;
        assert_eq!(h.client.calls(), 0);
    }

    #[tokio::test]
    async fn settings_are_read_at_send_time() {
        let mut h = harness(vec![Script::Fragments(vec!["<p/>"])]);
        h.settings
            .save(&Settings {
                api_key: "sk-rotated".to_string(),
                selected_model: "anthropic/claude-haiku-4.5".to_string(),
            })
            .unwrap();

        h.controller.send_message("waves");
        drive(&mut h).await;

        let requests = h.client.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "anthropic/claude-haiku-4.5");
        assert_eq!(requests[0].credential, "sk-rotated");
    }

    #[tokio::test]
    async fn send_without_selection_creates_conversation_titled_by_prompt() {
        let mut h = harness(vec![Script::Fragments(vec!["<p/>"])]);
        let welcome = selected(&h).id();
        h.controller.delete_conversation(welcome);
        assert_eq!(h.controller.state().selected_conversation_id(), None);

        h.controller.send_message("Pendulum");
        drive(&mut h).await;

        let conversation = selected(&h);
        assert_eq!(conversation.title(), "Pendulum");
        assert_eq!(conversation.messages().len(), 2);
        assert_eq!(h.controller.state().conversations().len(), 1);
    }

    #[tokio::test]
    async fn send_without_selection_keeps_prompt_text_and_saves_once() {
        let logger = Arc::new(RecordingLogger::default());
        let Harness {
            controller,
            mut updates,
            store,
            ..
        } = harness(vec![Script::Fragments(vec!["<p/>"])]);
        let mut controller = controller.with_transcript_logger(logger.clone());
        let welcome = controller.state().conversations()[0].id();
        controller.delete_conversation(welcome);
        let saves_before = store.save_count();

        controller.send_message("  Pendulum  ");
        assert_eq!(store.save_count(), saves_before);
        timeout(
            Duration::from_secs(5),
            controller.drive_until_idle(&mut updates),
        )
        .await
        .unwrap();

        let conversation = controller.state().selected_conversation().unwrap();
        assert_eq!(conversation.title(), "  Pendulum  ");
        assert_eq!(store.save_count(), saves_before + 1);
        let saved = store.snapshot();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].messages().len(), 2);
        assert!(
            !logger
                .events
                .lock()
                .unwrap()
                .contains(&"conversation_created")
        );
    }

    #[tokio::test]
    async fn deleting_last_conversation_shows_welcome_document() {
        let mut h = harness(vec![Script::Fragments(vec!["<div>", "orbit", "</div>"])]);
        h.controller.send_message("Orbits");
        drive(&mut h).await;
        assert_eq!(h.controller.state().conversations().len(), 1);
        assert_eq!(h.controller.state().current_content(), "<div>orbit</div>");

        let only = selected(&h).id();
        assert!(h.controller.delete_conversation(only));

        let state = h.controller.state();
        assert!(state.conversations().is_empty());
        assert_eq!(state.selected_conversation_id(), None);
        assert_eq!(state.current_content(), WELCOME_DOCUMENT);
    }

    #[tokio::test]
    async fn second_prompt_in_same_conversation_appends() {
        let mut h = harness(vec![
            Script::Fragments(vec!["<p>one</p>"]),
            Script::Fragments(vec!["<p>two</p>"]),
        ]);
        h.controller.send_message("first");
        drive(&mut h).await;
        h.controller.send_message("second");
        drive(&mut h).await;

        let conversation = selected(&h);
        assert_eq!(conversation.title(), "first");
        assert_eq!(conversation.messages().len(), 4);
        assert_eq!(h.controller.state().current_content(), "<p>two</p>");
    }

    // ==================== Failures ====================

    #[tokio::test]
    async fn missing_credential_fails_without_network() {
        let mut h = harness_with(vec![], InMemoryConversationStore::new(), "");
        h.controller.send_message("gravity");
        drive(&mut h).await;

        let description = CompletionError::MissingCredential.to_string();
        let state = h.controller.state();
        assert_eq!(state.error_message(), Some(description.as_str()));
        assert!(!state.is_loading());
        assert_eq!(h.client.calls(), 0);

        let expected = error_document(&description);
        assert_eq!(state.current_content(), expected);
        let reply = selected(&h).last_assistant_message().unwrap();
        assert_eq!(reply.content(), expected);
        assert!(!reply.is_streaming());
        assert_eq!(h.store.save_count(), 1);
    }

    #[tokio::test]
    async fn http_failure_sets_error_and_next_send_clears_it() {
        let mut h = harness(vec![
            Script::Fail(CompletionError::InvalidResponse { status: 401 }),
            Script::Fragments(vec!["<p>ok</p>"]),
        ]);
        h.controller.send_message("first");
        drive(&mut h).await;
        assert_eq!(
            h.controller.state().error_message(),
            Some("Invalid response (HTTP 401)")
        );

        h.controller.send_message("again");
        assert_eq!(h.controller.state().error_message(), None);
        drive(&mut h).await;
        assert_eq!(h.controller.state().current_content(), "<p>ok</p>");
        assert_eq!(h.controller.state().error_message(), None);
    }

    // ==================== Cancellation ====================

    #[tokio::test]
    async fn cancel_keeps_partial_content_and_ignores_late_fragments() {
        let (script, slot) = manual();
        let mut h = harness(vec![script]);
        h.controller.send_message("gravity");
        let tx = sender_from(&slot).await;
        feed(&mut h, &tx, "<div>").await;
        let saves_before = h.store.save_count();

        assert!(h.controller.cancel_streaming());

        let state = h.controller.state();
        assert!(!state.is_loading());
        assert_eq!(state.error_message(), None);
        let reply = selected(&h).last_assistant_message().unwrap();
        assert!(!reply.is_streaming());
        assert_eq!(reply.content(), "<div>");
        assert_eq!(h.store.save_count(), saves_before);

        let _ = tx.send(Ok(StreamEvent::Delta("late".to_string()))).await;
        let _ = tx.send(Ok(StreamEvent::Completed)).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        while let Some(update) = h.updates.try_recv() {
            h.controller.apply_stream_update(update);
        }

        let reply = selected(&h).last_assistant_message().unwrap();
        assert_eq!(reply.content(), "<div>");
        assert_eq!(h.controller.state().current_content(), "<div>");
        assert!(!h.controller.state().is_loading());
    }

    #[tokio::test]
    async fn cancel_when_idle_is_a_no_op() {
        let mut h = harness(vec![]);
        assert!(!h.controller.cancel_streaming());
        assert!(drain_events(&mut h).is_empty());
    }

    #[tokio::test]
    async fn new_prompt_supersedes_active_stream() {
        let (script, slot) = manual();
        let mut h = harness(vec![script, Script::Fragments(vec!["<p>b</p>"])]);
        h.controller.send_message("a");
        let first_tx = sender_from(&slot).await;
        feed(&mut h, &first_tx, "<div>").await;

        h.controller.send_message("b");
        assert_eq!(streaming_count(&h), 1);
        let _ = first_tx
            .send(Ok(StreamEvent::Delta("stale".to_string())))
            .await;
        drive(&mut h).await;

        let messages = selected(&h).messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[1].content(), "<div>");
        assert!(!messages[1].is_streaming());
        assert_eq!(messages[3].content(), "<p>b</p>");
        assert_eq!(h.controller.state().current_content(), "<p>b</p>");
        assert_eq!(streaming_count(&h), 0);
    }

    #[tokio::test]
    async fn updates_from_unknown_streams_are_dropped() {
        let mut h = harness(vec![]);
        h.controller.apply_stream_update(StreamUpdate {
            stream_id: StreamId(999),
            kind: StreamUpdateKind::Fragment("<p>ghost</p>".to_string()),
        });
        assert_eq!(h.controller.state().current_content(), WELCOME_DOCUMENT);
        assert!(drain_events(&mut h).is_empty());
    }

    // ==================== Conversations ====================

    #[tokio::test]
    async fn create_conversation_selects_and_persists() {
        let mut h = harness(vec![]);
        let id = h.controller.create_conversation("  ");

        let state = h.controller.state();
        assert_eq!(state.conversations().len(), 2);
        assert_eq!(state.conversations()[0].id(), id);
        assert_eq!(state.selected_conversation_id(), Some(id));
        assert_eq!(selected(&h).title(), NEW_CONVERSATION_TITLE);
        assert_eq!(state.current_content(), WELCOME_DOCUMENT);
        assert_eq!(h.store.save_count(), 1);

        let events = drain_events(&mut h);
        assert!(events.contains(&SessionEvent::ConversationsChanged));
        assert!(events.contains(&SessionEvent::SelectionChanged(Some(id))));
    }

    #[tokio::test]
    async fn deleting_selected_conversation_reselects_first() {
        let mut a = Conversation::new("a");
        a.push_message(Message::user_text(a.id(), "a"));
        let b = Conversation::new("b");
        let store = InMemoryConversationStore::with_conversations(vec![a.clone(), b.clone()]);
        let mut h = harness_with(vec![], store, "sk");

        assert!(h.controller.select_conversation(b.id()));
        assert!(h.controller.delete_conversation(b.id()));

        let state = h.controller.state();
        assert_eq!(state.selected_conversation_id(), Some(a.id()));
        assert_eq!(state.conversations().len(), 1);
        assert_eq!(h.store.snapshot().len(), 1);
        assert!(!h.controller.delete_conversation(b.id()));
    }

    #[tokio::test]
    async fn selecting_unknown_conversation_is_ignored() {
        let mut h = harness(vec![]);
        let before = h.controller.state().selected_conversation_id();
        assert!(!h.controller.select_conversation(ConversationId::new()));
        assert_eq!(h.controller.state().selected_conversation_id(), before);
    }

    #[tokio::test]
    async fn selecting_shows_latest_document() {
        let mut h = harness(vec![Script::Fragments(vec!["<p>done</p>"])]);
        h.controller.send_message("first");
        drive(&mut h).await;
        let first = selected(&h).id();

        h.controller.create_conversation("empty");
        assert_eq!(h.controller.state().current_content(), WELCOME_DOCUMENT);

        h.controller.select_conversation(first);
        assert_eq!(h.controller.state().current_content(), "<p>done</p>");
    }

    #[tokio::test]
    async fn deleting_streaming_conversation_cancels_stream() {
        let (script, slot) = manual();
        let mut h = harness(vec![script]);
        h.controller.send_message("gravity");
        let _tx = sender_from(&slot).await;
        let id = selected(&h).id();

        h.controller.delete_conversation(id);

        assert!(!h.controller.is_streaming());
        assert!(!h.controller.state().is_loading());
        assert!(h.controller.state().conversations().is_empty());
    }

    #[tokio::test]
    async fn stream_keeps_filling_its_conversation_after_switching_away() {
        let (script, slot) = manual();
        let mut h = harness(vec![script]);
        h.controller.send_message("gravity");
        let streaming = selected(&h).id();
        let tx = sender_from(&slot).await;

        h.controller.create_conversation("other");
        feed(&mut h, &tx, "<div>x</div>").await;
        assert_eq!(h.controller.state().current_content(), WELCOME_DOCUMENT);

        tx.send(Ok(StreamEvent::Completed)).await.unwrap();
        drive(&mut h).await;
        h.controller.select_conversation(streaming);
        assert_eq!(h.controller.state().current_content(), "<div>x</div>");
    }

    // ==================== Events & transcript ====================

    #[tokio::test]
    async fn loading_events_bracket_a_stream() {
        let mut h = harness(vec![Script::Fragments(vec!["<p/>"])]);
        h.controller.send_message("x");
        drive(&mut h).await;

        let events = drain_events(&mut h);
        let started = events
            .iter()
            .position(|e| *e == SessionEvent::LoadingChanged(true))
            .unwrap();
        let finished = events
            .iter()
            .position(|e| *e == SessionEvent::LoadingChanged(false))
            .unwrap();
        assert!(started < finished);
    }

    #[tokio::test]
    async fn transcript_records_session_activity() {
        let logger = Arc::new(RecordingLogger::default());
        let Harness {
            controller,
            mut updates,
            ..
        } = harness(vec![Script::Fragments(vec!["<p/>"])]);
        let mut controller = controller.with_transcript_logger(logger.clone());

        controller.create_conversation("topic");
        controller.send_message("x");
        timeout(
            Duration::from_secs(5),
            controller.drive_until_idle(&mut updates),
        )
        .await
        .unwrap();

        assert_eq!(
            *logger.events.lock().unwrap(),
            vec!["conversation_created", "prompt_sent", "stream_completed"]
        );
    }
}
