//! HTML preview file
//!
//! The generated document is a body fragment. [`HtmlPreviewSink`] wraps it in
//! a dark page shell and rewrites the preview file, so a browser tab pointed
//! at it shows the latest state after a reload.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Wrap a document fragment in the dark page shell.
pub fn page_shell(content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <style>
        * {{ box-sizing: border-box; }}
        html, body {{
            margin: 0;
            padding: 16px;
            background-color: #1C1C21;
            color: #FFFFFF;
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif;
            font-size: 16px;
            line-height: 1.6;
            min-height: 100vh;
        }}
        a {{ color: #6ECBD3; }}
        pre, code {{
            border-radius: 6px;
            padding: 2px 6px;
            font-family: 'SF Mono', Menlo, monospace;
        }}
        pre {{ padding: 12px; overflow-x: auto; }}
    </style>
</head>
<body>
{}
</body>
</html>
"#,
        content
    )
}

/// Writes the current document to a preview file
pub struct HtmlPreviewSink {
    path: PathBuf,
}

impl HtmlPreviewSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the preview with `document`, creating parent directories.
    pub fn write(&self, document: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, page_shell(document))
    }
}
