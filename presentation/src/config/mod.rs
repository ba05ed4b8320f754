//! Presentation-level configuration
//!
//! Configuration for terminal output and the preview file.

use std::path::PathBuf;

/// Output configuration for the presentation layer
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Enable colored terminal output
    pub color: bool,
    /// Show the streaming spinner
    pub show_progress: bool,
    /// HTML file rewritten with the current document; `None` disables it
    pub preview_file: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            color: true,
            show_progress: true,
            preview_file: None,
        }
    }
}
