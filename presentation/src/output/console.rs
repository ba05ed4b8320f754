//! Console output formatting for the interactive session

use colored::Colorize;
use std::path::Path;
use visualizer_domain::util::preview;
use visualizer_domain::{AVAILABLE_MODELS, ConversationId, SessionState, model_display_name};

/// Formats session information for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Banner shown when the interactive session starts
    pub fn welcome(model: &str, preview_file: Option<&Path>) -> String {
        let mut output = String::new();
        output.push('\n');
        output.push_str(&Self::header("Experiment Visualizer"));
        output.push_str("\n\n");
        output.push_str(&format!("{} {}\n", "Model:".cyan().bold(), model));
        match preview_file {
            Some(path) => output.push_str(&format!(
                "{} {}\n",
                "Preview:".cyan().bold(),
                path.display()
            )),
            None => output.push_str(&format!("{} {}\n", "Preview:".cyan().bold(), "off".dimmed())),
        }
        output.push_str(&format!(
            "\n{}\n",
            "Type a concept to visualize it, or /help for commands.".dimmed()
        ));
        output
    }

    pub fn help() -> String {
        let commands = [
            ("/new [title]", "Start a new conversation"),
            ("/list", "List conversations"),
            ("/open <n>", "Select conversation n"),
            ("/delete <n>", "Delete conversation n"),
            ("/cancel", "Stop the document being generated"),
            ("/key <api-key>", "Set the API key"),
            ("/model [id]", "Show or set the model"),
            ("/models", "List suggested models"),
            ("/help", "Show this help"),
            ("/quit", "Exit"),
        ];
        let mut output = format!("\n{}\n", "Commands:".cyan().bold());
        for (command, description) in commands {
            output.push_str(&format!("  {:<16} {}\n", command, description));
        }
        output
    }

    /// Numbered conversation list, newest first, with the selection marked
    pub fn conversation_list(state: &SessionState, streaming: Option<ConversationId>) -> String {
        if state.conversations().is_empty() {
            return format!("{}\n", "No conversations.".dimmed());
        }
        let selected = state.selected_conversation_id();
        let mut output = String::new();
        for (index, conversation) in state.conversations().iter().enumerate() {
            let title = preview(conversation.title(), 50);
            let marker = if Some(conversation.id()) == selected {
                "*".green().bold().to_string()
            } else {
                " ".to_string()
            };
            let title = if Some(conversation.id()) == selected {
                title.bold().to_string()
            } else {
                title.to_string()
            };
            output.push_str(&format!(
                "{} {:>2}. {} {}",
                marker,
                index + 1,
                title,
                format!("({} messages)", conversation.messages().len()).dimmed()
            ));
            if Some(conversation.id()) == streaming {
                output.push_str(&format!(" {}", "streaming".yellow()));
            }
            output.push('\n');
        }
        output
    }

    /// Suggested models with the current one marked
    pub fn models(current: &str) -> String {
        let mut output = format!("{}\n", "Models:".cyan().bold());
        for model in AVAILABLE_MODELS {
            let line = format!("{} ({})", model, model_display_name(model));
            if *model == current {
                output.push_str(&format!("{} {}\n", "*".green().bold(), line.bold()));
            } else {
                output.push_str(&format!("  {}\n", line));
            }
        }
        if !AVAILABLE_MODELS.contains(&current) {
            output.push_str(&format!("{} {} {}\n", "*".green().bold(), current.bold(), "(custom)".dimmed()));
        }
        output
    }

    pub fn error(message: &str) -> String {
        format!("{} {}", "Error:".red().bold(), message)
    }

    pub fn notice(message: &str) -> String {
        format!("{}", message.dimmed())
    }

    /// Shown when a document finished streaming
    pub fn document_ready(bytes: usize, preview_file: Option<&Path>) -> String {
        let mut output = format!("{} {} bytes", "Done:".green().bold(), bytes);
        if let Some(path) = preview_file {
            output.push_str(&format!(" {} {}", "->".dimmed(), path.display()));
        }
        output
    }

    /// A key safe to echo: the first three and last four characters.
    pub fn masked_key(key: &str) -> String {
        let chars: Vec<char> = key.chars().collect();
        if chars.len() <= 8 {
            return "*".repeat(chars.len());
        }
        let head: String = chars[..3].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}…{}", head, tail)
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(48);
        format!("{}\n{:^48}\n{}", line.cyan(), title.bold(), line.cyan())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use visualizer_domain::{Conversation, DEFAULT_MODEL, Message};

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn test_conversation_list_marks_selection() {
        plain();
        let mut first = Conversation::new("Pendulum");
        first.push_message(Message::user_text(first.id(), "Pendulum"));
        let second = Conversation::new("Optics");
        let mut state = SessionState::with_conversations(vec![first, second.clone()]);
        state.select(second.id());

        let output = ConsoleFormatter::conversation_list(&state, Some(second.id()));
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("   1. Pendulum (1 messages)"));
        assert!(lines[1].starts_with("*  2. Optics"));
        assert!(lines[1].ends_with("streaming"));
    }

    #[test]
    fn test_empty_conversation_list() {
        plain();
        let output = ConsoleFormatter::conversation_list(&SessionState::new(), None);
        assert_eq!(output.trim(), "No conversations.");
    }

    #[test]
    fn test_models_marks_current() {
        plain();
        let output = ConsoleFormatter::models(DEFAULT_MODEL);
        assert!(output.contains("* openai/gpt-5-mini (gpt-5-mini)"));
        assert!(!output.contains("(custom)"));

        let output = ConsoleFormatter::models("meta/llama-4");
        assert!(output.contains("meta/llama-4 (custom)"));
    }

    #[test]
    fn test_masked_key() {
        assert_eq!(ConsoleFormatter::masked_key("sk-or-v1-abcdef1234"), "sk-…1234");
        assert_eq!(ConsoleFormatter::masked_key("short"), "*****");
    }

    #[test]
    fn test_document_ready_mentions_preview() {
        plain();
        let output = ConsoleFormatter::document_ready(42, Some(Path::new("/tmp/p.html")));
        assert_eq!(output, "Done: 42 bytes -> /tmp/p.html");
    }
}
