//! Fixed HTML documents shown in the content area.

use crate::util::escape_html;

/// Shown when nothing has been generated yet for the selected conversation.
pub const WELCOME_DOCUMENT: &str = r#"<div style="display: flex; flex-direction: column; justify-content: center; align-items: center; min-height: 80vh; text-align: center;">
    <h1 style="font-size: 28px; font-weight: 600; margin-bottom: 16px;">Experiment Visualizer</h1>
    <p style="color: rgba(255,255,255,0.6); font-size: 16px;">Enter a knowledge point and the AI will generate an interactive visualization</p>
</div>"#;

/// Build the document that replaces the content area when a request fails.
pub fn error_document(description: &str) -> String {
    format!(
        r#"<div style="display: flex; flex-direction: column; justify-content: center; align-items: center; min-height: 80vh; text-align: center;">
    <h2 style="color: #ff6b6b;">Request failed</h2>
    <p style="color: rgba(255,255,255,0.6);">{}</p>
</div>"#,
        escape_html(description)
    )
}
