//! Presentation layer for experiment-visualizer
//!
//! This crate contains the CLI definition, console formatting, the HTML
//! preview file, the streaming spinner, and the interactive and one-shot
//! session drivers.

pub mod chat;
pub mod cli;
pub mod config;
pub mod output;
pub mod progress;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use chat::{ChatRepl, OneShot, OneShotError};
pub use cli::commands::Cli;
pub use config::OutputConfig;
pub use output::console::ConsoleFormatter;
pub use output::preview::{HtmlPreviewSink, page_shell};
pub use progress::reporter::StreamProgress;
