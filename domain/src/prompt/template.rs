//! Prompt templates for visualization requests

/// Templates for the messages sent to the completions endpoint
pub struct PromptTemplate;

impl PromptTemplate {
    /// System prompt asking for a self-contained interactive HTML visualization
    pub fn visualization_system() -> &'static str {
        r#"You are an educational visualization assistant. The user will enter a knowledge point, and you generate a piece of interactive HTML/CSS/JavaScript code that visualizes it.

Requirements:
1. Output the HTML code directly. Do not wrap it in a markdown code block (no ```html or ``` fences).
2. The code must be complete and runnable as-is.
3. Use a dark theme (background #1C1C21, white text, accent color #6ECBD3).
4. Include animation or interaction that helps understanding.
5. Keep the code concise and focus on the visual effect.
6. Provide a slider for every adjustable parameter of the knowledge point.

Layout requirements:
1. About 75% of the width on the left is the visual experiment.
2. About 25% of the width on the right holds the parameter controls, an explanation of the knowledge point and its background."#
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_forbids_code_fences() {
        let prompt = PromptTemplate::visualization_system();
        assert!(prompt.contains("Do not wrap it in a markdown code block"));
        assert!(prompt.contains("#1C1C21"));
    }
}
