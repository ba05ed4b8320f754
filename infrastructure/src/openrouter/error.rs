//! Error types for the OpenRouter adapter

use thiserror::Error;
use visualizer_application::CompletionError;

/// Errors that can occur when talking to the completion endpoint
#[derive(Error, Debug)]
pub enum OpenRouterError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid response (HTTP {status})")]
    Status { status: u16 },
}

impl From<OpenRouterError> for CompletionError {
    fn from(error: OpenRouterError) -> Self {
        match error {
            OpenRouterError::Status { status } => CompletionError::InvalidResponse { status },
            OpenRouterError::Http(e) => match e.status() {
                Some(status) => CompletionError::InvalidResponse {
                    status: status.as_u16(),
                },
                None => CompletionError::Transport(e.to_string()),
            },
            OpenRouterError::Serialization(e) => CompletionError::Transport(e.to_string()),
        }
    }
}
