//! Storage and transcript configuration from TOML (`[storage]` and `[log]` sections)

use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw storage configuration from TOML
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStorageConfig {
    /// Where `conversations.json` and `settings.toml` live
    pub data_dir: Option<PathBuf>,
}

impl FileStorageConfig {
    /// The configured directory, or the platform data directory.
    pub fn resolve_data_dir(&self) -> Option<PathBuf> {
        self.data_dir.clone().or_else(paths::default_data_dir)
    }
}

/// Raw log configuration from TOML
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLogConfig {
    /// JSONL transcript of session events (disabled when unset)
    pub transcript: Option<PathBuf>,
}
