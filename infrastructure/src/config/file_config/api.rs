//! Completion API configuration from TOML (`[api]` section)

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 300;
pub const DEFAULT_REFERER: &str = "Experiment Visualizer";

/// Raw API configuration from TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileApiConfig {
    /// Requests go to `{base_url}/chat/completions`
    pub base_url: String,
    /// Whole-request timeout; `None` means [`DEFAULT_TIMEOUT_SECONDS`]
    pub timeout_seconds: Option<u64>,
    /// Sent as the `HTTP-Referer` header
    pub referer: String,
}

impl Default for FileApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_seconds: None,
            referer: DEFAULT_REFERER.to_string(),
        }
    }
}

impl FileApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_defaults() {
        let config = FileApiConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(300));

        let config = FileApiConfig {
            timeout_seconds: Some(30),
            ..FileApiConfig::default()
        };
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }
}
