//! TOML-backed settings.
//!
//! [`TomlSettingsStore`] keeps `<data_dir>/settings.toml` and re-reads it on
//! every call, so a key saved from one command is used by the next send.
//! `VISUALIZER_API_KEY` and `VISUALIZER_SELECTED_MODEL` override the file.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use visualizer_application::{SettingsError, SettingsSource, SettingsStore};
use visualizer_domain::{DEFAULT_MODEL, Settings};

/// File name of the settings inside the data directory.
pub const SETTINGS_FILE_NAME: &str = "settings.toml";

const ENV_PREFIX: &str = "VISUALIZER_";

/// Settings persisted as TOML with environment overrides
pub struct TomlSettingsStore {
    path: PathBuf,
    env_overrides: bool,
}

impl TomlSettingsStore {
    /// Store at `<data_dir>/settings.toml`.
    pub fn in_dir(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(SETTINGS_FILE_NAME),
            env_overrides: true,
        }
    }

    /// Ignore `VISUALIZER_*` environment variables.
    pub fn without_env_overrides(mut self) -> Self {
        self.env_overrides = false;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Settings, figment::Error> {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(&self.path));
        if self.env_overrides {
            figment = figment.merge(Env::prefixed(ENV_PREFIX).only(&["api_key", "selected_model"]));
        }
        let mut settings: Settings = figment.extract()?;
        if settings.selected_model.trim().is_empty() {
            settings.selected_model = DEFAULT_MODEL.to_string();
        }
        Ok(settings)
    }
}

impl SettingsSource for TomlSettingsStore {
    fn settings(&self) -> Settings {
        match self.read() {
            Ok(settings) => settings,
            Err(e) => {
                warn!(
                    "Failed to read settings from {}, using defaults: {}",
                    self.path.display(),
                    e
                );
                Settings::default()
            }
        }
    }
}

impl SettingsStore for TomlSettingsStore {
    fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text =
            toml::to_string_pretty(settings).map_err(|e| SettingsError::Serialize(e.to_string()))?;

        let temp = self.path.with_extension("toml.tmp");
        fs::write(&temp, text)?;
        restrict_permissions(&temp)?;
        fs::rename(&temp, &self.path)?;
        Ok(())
    }
}

/// The file holds a credential; keep it private to the user.
#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
