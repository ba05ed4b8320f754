//! Completion client port
//!
//! Defines the interface for requesting a streamed HTML completion from a
//! chat-completion provider.

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use visualizer_domain::{Settings, StreamEvent};

/// Capacity of the channel between a transport pump and its [`StreamHandle`].
pub const STREAM_CHANNEL_CAPACITY: usize = 64;

/// Errors that can end a completion stream
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    #[error("Missing API key. Set one with /key before sending a prompt.")]
    MissingCredential,

    #[error("Invalid response (HTTP {status})")]
    InvalidResponse { status: u16 },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Request cancelled")]
    Cancelled,
}

impl CompletionError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CompletionError::Cancelled)
    }
}

/// A single prompt to be turned into an HTML document.
///
/// Built from the settings in effect at send time; the credential is never
/// printed by `Debug`.
#[derive(Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub model: String,
    pub credential: String,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>, settings: &Settings) -> Self {
        Self {
            prompt: prompt.into(),
            model: settings.effective_model().to_string(),
            credential: settings.api_key.trim().to_string(),
        }
    }

    /// Fail fast when no credential is configured.
    pub fn ensure_credential(&self) -> Result<(), CompletionError> {
        if self.credential.is_empty() {
            return Err(CompletionError::MissingCredential);
        }
        Ok(())
    }
}

impl fmt::Debug for CompletionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionRequest")
            .field("prompt", &self.prompt)
            .field("model", &self.model)
            .field("credential", &"<redacted>")
            .finish()
    }
}

/// Sending half used by transports to feed a [`StreamHandle`].
pub type StreamSender = mpsc::Sender<Result<StreamEvent, CompletionError>>;

/// Handle for receiving fragments of one completion.
///
/// Wraps the receiving half of the transport channel together with the
/// cancellation token of the request. Once the token is cancelled the handle
/// reports [`CompletionError::Cancelled`] and never a normal end of stream.
pub struct StreamHandle {
    receiver: mpsc::Receiver<Result<StreamEvent, CompletionError>>,
    cancellation: CancellationToken,
    /// Set once the stream reached its end, failed, or was cancelled
    outcome: Option<Result<(), CompletionError>>,
}

impl StreamHandle {
    pub fn new(
        receiver: mpsc::Receiver<Result<StreamEvent, CompletionError>>,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            receiver,
            cancellation,
            outcome: None,
        }
    }

    /// Create a connected sender/handle pair.
    pub fn channel(cancellation: CancellationToken) -> (StreamSender, Self) {
        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        (tx, Self::new(rx, cancellation))
    }

    /// Wait for the next fragment.
    ///
    /// Returns `Ok(Some(text))` for each fragment in arrival order and
    /// `Ok(None)` once the stream has finished normally. Further calls repeat
    /// the terminal result, except that a cancelled token always yields
    /// `Err(Cancelled)`.
    pub async fn next_fragment(&mut self) -> Result<Option<String>, CompletionError> {
        if self.cancellation.is_cancelled() {
            return self.terminate(Err(CompletionError::Cancelled));
        }
        if let Some(outcome) = &self.outcome {
            return outcome.clone().map(|()| None);
        }

        let item = tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => {
                return self.terminate(Err(CompletionError::Cancelled));
            }
            item = self.receiver.recv() => item,
        };

        match item {
            Some(Ok(StreamEvent::Delta(text))) => Ok(Some(text)),
            Some(Ok(StreamEvent::Completed)) => self.terminate(Ok(())),
            Some(Err(e)) => self.terminate(Err(e)),
            None if self.cancellation.is_cancelled() => {
                self.terminate(Err(CompletionError::Cancelled))
            }
            None => self.terminate(Err(CompletionError::Transport(
                "stream closed before completion".to_string(),
            ))),
        }
    }

    fn terminate(
        &mut self,
        outcome: Result<(), CompletionError>,
    ) -> Result<Option<String>, CompletionError> {
        self.outcome = Some(outcome.clone());
        outcome.map(|()| None)
    }

    /// Consume the stream and collect all fragments into a single string.
    pub async fn collect_text(mut self) -> Result<String, CompletionError> {
        let mut full_text = String::new();
        while let Some(fragment) = self.next_fragment().await? {
            full_text.push_str(&fragment);
        }
        Ok(full_text)
    }
}

/// Client for streamed completions
///
/// Implementations (adapters) live in the infrastructure layer. They must
/// validate the credential before any network activity and stop reading the
/// transport as soon as `cancellation` fires.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn stream_completion(
        &self,
        request: CompletionRequest,
        cancellation: CancellationToken,
    ) -> Result<StreamHandle, CompletionError>;
}
