//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! Every section and field is optional; missing values take the defaults.

mod api;
mod output;
mod storage;

pub use api::{DEFAULT_BASE_URL, DEFAULT_REFERER, DEFAULT_TIMEOUT_SECONDS, FileApiConfig};
pub use output::FileOutputConfig;
pub use storage::{FileLogConfig, FileStorageConfig};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("api.timeout_seconds cannot be 0")]
    InvalidTimeout,

    #[error("api.base_url cannot be empty")]
    EmptyBaseUrl,
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Completion API endpoint settings
    pub api: FileApiConfig,
    /// Data directory
    pub storage: FileStorageConfig,
    /// Terminal and preview output
    pub output: FileOutputConfig,
    /// Structured transcript
    pub log: FileLogConfig,
}

impl FileConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if let Some(0) = self.api.timeout_seconds {
            return Err(ConfigValidationError::InvalidTimeout);
        }
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigValidationError::EmptyBaseUrl);
        }
        Ok(())
    }
}
