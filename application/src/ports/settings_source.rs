//! Settings ports
//!
//! [`SettingsSource`] is read at the moment a prompt is sent, so edits made
//! between requests take effect on the next one. [`SettingsStore`] adds the
//! write side used by the settings commands.

use std::sync::RwLock;
use thiserror::Error;
use visualizer_domain::Settings;

/// Errors from persisting settings
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize settings: {0}")]
    Serialize(String),
}

/// Read-only access to the current settings
///
/// Never fails: sources fall back to [`Settings::default`] when their
/// backing storage cannot be read.
pub trait SettingsSource: Send + Sync {
    fn settings(&self) -> Settings;
}

/// Settings source that can also be written
pub trait SettingsStore: SettingsSource {
    fn save(&self, settings: &Settings) -> Result<(), SettingsError>;
}

/// Settings held in memory, used by tests and `--ephemeral` sessions.
#[derive(Default)]
pub struct InMemorySettings {
    settings: RwLock<Settings>,
}

impl InMemorySettings {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: RwLock::new(settings),
        }
    }

    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self::new(Settings {
            api_key: api_key.into(),
            ..Settings::default()
        })
    }
}

impl SettingsSource for InMemorySettings {
    fn settings(&self) -> Settings {
        match self.settings.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl SettingsStore for InMemorySettings {
    fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        let mut guard = match self.settings.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = settings.clone();
        Ok(())
    }
}
