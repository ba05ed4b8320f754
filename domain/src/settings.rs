//! User settings value object and the catalog of selectable models.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Model used when none has been chosen.
pub const DEFAULT_MODEL: &str = "openai/gpt-5-mini";

/// Models offered by the settings form.
pub const AVAILABLE_MODELS: &[&str] = &[
    "openai/gpt-5-mini",
    "openai/gpt-5",
    "anthropic/claude-haiku-4.5",
    "google/gemini-3-pro-preview",
];

/// Short label for a model id: the part after the last `/`.
pub fn model_display_name(model: &str) -> &str {
    model.rsplit('/').next().unwrap_or(model)
}

/// Credential and model selection read before every request (Value Object)
///
/// An empty `api_key` means no credential is configured.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_key: String,
    pub selected_model: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            selected_model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl Settings {
    pub fn has_credential(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// The model to request; blank selections fall back to [`DEFAULT_MODEL`].
    pub fn effective_model(&self) -> &str {
        let model = self.selected_model.trim();
        if model.is_empty() { DEFAULT_MODEL } else { model }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = if self.api_key.is_empty() {
            "<unset>"
        } else {
            "<redacted>"
        };
        f.debug_struct("Settings")
            .field("api_key", &key)
            .field("selected_model", &self.selected_model)
            .finish()
    }
}
