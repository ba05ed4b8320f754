//! OpenRouter adapter
//!
//! Implements the [`CompletionClient`](visualizer_application::CompletionClient)
//! port against an OpenAI-compatible `/chat/completions` endpoint that streams
//! Server-Sent Events.
//!
//! - [`client`]: HTTP request, status check, and the body pump task
//! - [`sse`]: byte-level line decoding and `data:` line interpretation
//! - [`protocol`]: request and chunk wire types

pub mod client;
pub mod error;
pub mod protocol;
pub mod sse;

pub use client::{OpenRouterClient, OpenRouterConfig};
pub use error::OpenRouterError;
