//! Output configuration from TOML (`[output]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw output configuration from TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOutputConfig {
    /// Enable colored terminal output
    pub color: bool,
    /// HTML file rewritten with the current document (default: `<data_dir>/preview.html`)
    pub preview_file: Option<PathBuf>,
}

impl Default for FileOutputConfig {
    fn default() -> Self {
        Self {
            color: true,
            preview_file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_section_deserialize() {
        let toml_str = r#"
[output]
color = false
preview_file = "/tmp/preview.html"
"#;
        let config: super::super::FileConfig = toml::from_str(toml_str).unwrap();
        assert!(!config.output.color);
        assert_eq!(
            config.output.preview_file,
            Some(PathBuf::from("/tmp/preview.html"))
        );
    }
}
