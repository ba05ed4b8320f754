//! Session fixtures shared by the chat tests

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use visualizer_application::{
    CompletionClient, CompletionError, CompletionRequest, InMemoryConversationStore,
    InMemorySettings, SessionController, SessionDependencies, SessionEvent, StreamHandle,
    StreamUpdates,
};
use visualizer_domain::StreamEvent;

/// Completion client that replays fixed fragments, or never answers.
pub(crate) struct FixedClient {
    fragments: Option<Vec<String>>,
}

impl FixedClient {
    pub(crate) fn fragments(fragments: &[&str]) -> Self {
        Self {
            fragments: Some(fragments.iter().map(|f| f.to_string()).collect()),
        }
    }

    /// A stream that stays open until cancelled
    pub(crate) fn pending() -> Self {
        Self { fragments: None }
    }
}

#[async_trait]
impl CompletionClient for FixedClient {
    async fn stream_completion(
        &self,
        request: CompletionRequest,
        cancellation: CancellationToken,
    ) -> Result<StreamHandle, CompletionError> {
        request.ensure_credential()?;
        let (tx, handle) = StreamHandle::channel(cancellation.clone());
        let fragments = self.fragments.clone();
        tokio::spawn(async move {
            let Some(fragments) = fragments else {
                cancellation.cancelled().await;
                drop(tx);
                return;
            };
            for fragment in fragments {
                if tx.send(Ok(StreamEvent::Delta(fragment))).await.is_err() {
                    return;
                }
            }
            let _ = tx.send(Ok(StreamEvent::Completed)).await;
        });
        Ok(handle)
    }
}

pub(crate) struct Session {
    pub(crate) controller: SessionController,
    pub(crate) updates: StreamUpdates,
    pub(crate) events: mpsc::UnboundedReceiver<SessionEvent>,
    pub(crate) settings: Arc<InMemorySettings>,
}

pub(crate) fn session_with(client: FixedClient, key: &str) -> Session {
    let settings = Arc::new(InMemorySettings::with_api_key(key));
    let (tx, events) = mpsc::unbounded_channel();
    let (controller, updates) = SessionController::new(
        SessionDependencies {
            completion_client: Arc::new(client),
            settings: settings.clone(),
            store: Arc::new(InMemoryConversationStore::new()),
        },
        tx,
    );
    Session {
        controller,
        updates,
        events,
        settings,
    }
}

pub(crate) fn controller_with(
    client: FixedClient,
    key: &str,
) -> (SessionController, StreamUpdates, mpsc::UnboundedReceiver<SessionEvent>) {
    let session = session_with(client, key);
    (session.controller, session.updates, session.events)
}
