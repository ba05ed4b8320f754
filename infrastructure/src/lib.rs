//! Infrastructure layer for experiment-visualizer
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod config;
pub mod logging;
pub mod openrouter;
pub mod paths;
pub mod settings_store;
pub mod storage;

// Re-export commonly used types
pub use config::{
    ConfigLoader, ConfigValidationError, FileApiConfig, FileConfig, FileLogConfig,
    FileOutputConfig, FileStorageConfig,
};
pub use logging::JsonlTranscriptLogger;
pub use openrouter::{OpenRouterClient, OpenRouterConfig, OpenRouterError};
pub use settings_store::TomlSettingsStore;
pub use storage::JsonFileConversationStore;
