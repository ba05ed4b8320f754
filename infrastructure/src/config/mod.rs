//! Configuration file loading for experiment-visualizer
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `--config <path>` specified file
//! 2. Project root: `./visualizer.toml` or `./.visualizer.toml`
//! 3. Global: `$XDG_CONFIG_HOME/experiment-visualizer/config.toml`
//! 4. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, DEFAULT_BASE_URL, DEFAULT_REFERER, DEFAULT_TIMEOUT_SECONDS,
    FileApiConfig, FileConfig, FileLogConfig, FileOutputConfig, FileStorageConfig,
};
pub use loader::ConfigLoader;
