//! JSON document holding every conversation.
//!
//! The whole collection is written as one pretty-printed array with camelCase
//! keys. Writes go to a sibling temp file that is then renamed over the store,
//! so readers never observe a half-written document.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;
use visualizer_application::{ConversationStore, StoreError};
use visualizer_domain::Conversation;

/// File name of the store inside the data directory.
pub const STORE_FILE_NAME: &str = "conversations.json";

/// Conversation store backed by `<data_dir>/conversations.json`
pub struct JsonFileConversationStore {
    path: PathBuf,
}

impl JsonFileConversationStore {
    /// Store at `<data_dir>/conversations.json`.
    pub fn in_dir(data_dir: impl AsRef<Path>) -> Self {
        Self::at_path(data_dir.as_ref().join(STORE_FILE_NAME))
    }

    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| STORE_FILE_NAME.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl ConversationStore for JsonFileConversationStore {
    fn load(&self) -> Result<Vec<Conversation>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No store at {}, starting empty", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(StoreError::Io(e)),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        let conversations: Vec<Conversation> = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::CorruptStore(format!("{}: {}", self.path.display(), e)))?;
        debug!(
            "Loaded {} conversation(s) from {}",
            conversations.len(),
            self.path.display()
        );
        Ok(conversations)
    }

    fn save(&self, conversations: &[Conversation]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(conversations)
            .map_err(|e| StoreError::Serialize(e.to_string()))?;

        let temp = self.temp_path();
        fs::write(&temp, json)?;
        fs::rename(&temp, &self.path)?;
        debug!(
            "Saved {} conversation(s) to {}",
            conversations.len(),
            self.path.display()
        );
        Ok(())
    }
}
