//! Platform directories.

use std::path::PathBuf;

/// Directory name used under the platform config and data directories.
pub const APP_DIR_NAME: &str = "experiment-visualizer";

/// `$XDG_DATA_HOME/experiment-visualizer` or the platform equivalent.
pub fn default_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join(APP_DIR_NAME))
}

/// `$XDG_CONFIG_HOME/experiment-visualizer/config.toml` or the platform equivalent.
pub fn global_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.toml"))
}
