//! Interactive session loop
//!
//! A single task owns the [`SessionController`] and multiplexes three inputs:
//! stream updates from the background completion task, session events the
//! controller emits, and lines read from stdin.

use crate::config::OutputConfig;
use crate::output::console::ConsoleFormatter;
use crate::output::preview::HtmlPreviewSink;
use crate::progress::reporter::StreamProgress;
use std::io::{self, Write};
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use visualizer_application::{SessionController, SessionEvent, SettingsStore, StreamUpdates};
use visualizer_domain::{ConversationId, Settings};

/// Interactive chat REPL
pub struct ChatRepl {
    controller: SessionController,
    updates: StreamUpdates,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    settings: Arc<dyn SettingsStore>,
    preview: Option<HtmlPreviewSink>,
    progress: StreamProgress,
    /// Set when the user stopped the stream, so its end is not announced as done.
    cancel_requested: bool,
}

impl ChatRepl {
    pub fn new(
        controller: SessionController,
        updates: StreamUpdates,
        events: mpsc::UnboundedReceiver<SessionEvent>,
        settings: Arc<dyn SettingsStore>,
        config: &OutputConfig,
    ) -> Self {
        Self {
            controller,
            updates,
            events,
            settings,
            preview: config.preview_file.clone().map(HtmlPreviewSink::new),
            progress: StreamProgress::new(config.show_progress),
            cancel_requested: false,
        }
    }

    /// Run until `/quit`, end of input or Ctrl-C while idle.
    pub async fn run(mut self) -> io::Result<()> {
        let model = self.settings.settings().effective_model().to_string();
        println!(
            "{}",
            ConsoleFormatter::welcome(&model, self.preview.as_ref().map(HtmlPreviewSink::path))
        );
        self.refresh_preview();

        let mut lines = spawn_line_reader();
        prompt()?;

        loop {
            tokio::select! {
                biased;
                Some(update) = self.updates.recv() => {
                    self.controller.apply_stream_update(update);
                }
                Some(event) = self.events.recv() => {
                    if self.on_event(event) {
                        prompt()?;
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    if !self.cancel() {
                        println!();
                        break;
                    }
                }
                line = lines.recv() => {
                    let Some(line) = line else {
                        println!();
                        break;
                    };
                    if self.handle_line(&line).is_break() {
                        break;
                    }
                    if !self.controller.is_streaming() {
                        prompt()?;
                    }
                }
            }
        }

        self.controller.cancel_streaming();
        self.progress.finish();
        Ok(())
    }

    /// Render one session event. Returns true when the input prompt should be shown again.
    fn on_event(&mut self, event: SessionEvent) -> bool {
        debug!("Session event: {:?}", event);
        match event {
            SessionEvent::ContentChanged => {
                self.refresh_preview();
                false
            }
            SessionEvent::LoadingChanged(true) => {
                self.cancel_requested = false;
                let model = self.settings.settings().effective_model().to_string();
                self.progress.start(&model);
                false
            }
            SessionEvent::LoadingChanged(false) => {
                self.progress.finish();
                let state = self.controller.state();
                if !self.cancel_requested && state.error_message().is_none() {
                    println!(
                        "{}",
                        ConsoleFormatter::document_ready(
                            state.current_content().len(),
                            self.preview.as_ref().map(HtmlPreviewSink::path),
                        )
                    );
                }
                self.cancel_requested = false;
                true
            }
            SessionEvent::MessageUpdated { .. } => {
                self.progress.set_bytes(self.controller.streamed_bytes());
                false
            }
            SessionEvent::ErrorChanged(Some(message)) => {
                self.progress.println(ConsoleFormatter::error(&message));
                false
            }
            SessionEvent::ErrorChanged(None)
            | SessionEvent::ConversationsChanged
            | SessionEvent::SelectionChanged(_) => false,
        }
    }

    fn refresh_preview(&self) {
        if let Some(preview) = &self.preview
            && let Err(e) = preview.write(self.controller.state().current_content())
        {
            warn!("Failed to write preview {}: {}", preview.path().display(), e);
        }
    }

    fn handle_line(&mut self, line: &str) -> ControlFlow<()> {
        let line = line.trim();
        if line.is_empty() {
            return ControlFlow::Continue(());
        }
        if let Some(command) = line.strip_prefix('/') {
            return self.handle_command(command);
        }
        self.controller.send_message(line);
        ControlFlow::Continue(())
    }

    fn handle_command(&mut self, command: &str) -> ControlFlow<()> {
        let (name, args) = command
            .split_once(char::is_whitespace)
            .map(|(name, args)| (name, args.trim()))
            .unwrap_or((command, ""));

        match name {
            "quit" | "exit" | "q" => {
                println!("Bye!");
                return ControlFlow::Break(());
            }
            "help" | "h" | "?" => print!("{}", ConsoleFormatter::help()),
            "new" => {
                self.controller.create_conversation(args);
                println!("{}", ConsoleFormatter::notice("Started a new conversation."));
            }
            "list" | "ls" => print!(
                "{}",
                ConsoleFormatter::conversation_list(
                    self.controller.state(),
                    self.controller.streaming_conversation_id(),
                )
            ),
            "open" => match self.conversation_at(args) {
                Ok(id) => {
                    self.controller.select_conversation(id);
                    let title = self
                        .controller
                        .state()
                        .conversation(id)
                        .map(|c| c.title().to_string())
                        .unwrap_or_default();
                    println!("{}", ConsoleFormatter::notice(&format!("Opened \"{}\"", title)));
                }
                Err(message) => println!("{}", ConsoleFormatter::error(&message)),
            },
            "delete" | "rm" => match self.conversation_at(args) {
                Ok(id) => {
                    if self.controller.streaming_conversation_id() == Some(id) {
                        self.cancel_requested = true;
                    }
                    self.controller.delete_conversation(id);
                    println!("{}", ConsoleFormatter::notice("Conversation deleted."));
                }
                Err(message) => println!("{}", ConsoleFormatter::error(&message)),
            },
            "cancel" => {
                if self.cancel() {
                    println!("{}", ConsoleFormatter::notice("Cancelled."));
                } else {
                    println!("{}", ConsoleFormatter::notice("Nothing to cancel."));
                }
            }
            "key" => self.set_key(args),
            "model" => self.set_model(args),
            "models" => print!(
                "{}",
                ConsoleFormatter::models(self.settings.settings().effective_model())
            ),
            _ => println!(
                "{}",
                ConsoleFormatter::error(&format!("Unknown command: /{} (try /help)", name))
            ),
        }
        ControlFlow::Continue(())
    }

    /// Stop the active stream. Returns false when nothing was streaming.
    fn cancel(&mut self) -> bool {
        if !self.controller.is_streaming() {
            return false;
        }
        self.cancel_requested = true;
        self.controller.cancel_streaming()
    }

    /// Resolve a 1-based position in the conversation list.
    fn conversation_at(&self, args: &str) -> Result<ConversationId, String> {
        let position: usize = args
            .parse()
            .map_err(|_| format!("Expected a conversation number, got \"{}\"", args))?;
        let conversations = self.controller.state().conversations();
        position
            .checked_sub(1)
            .and_then(|index| conversations.get(index))
            .map(|c| c.id())
            .ok_or_else(|| format!("No conversation {} (there are {})", position, conversations.len()))
    }

    fn set_key(&self, args: &str) {
        let current = self.settings.settings();
        if args.is_empty() {
            if current.has_credential() {
                println!("API key: {}", ConsoleFormatter::masked_key(current.api_key.trim()));
            } else {
                println!("{}", ConsoleFormatter::notice("No API key set. Use /key <api-key>."));
            }
            return;
        }
        self.save_settings(
            Settings {
                api_key: args.to_string(),
                ..current
            },
            &format!("API key saved: {}", ConsoleFormatter::masked_key(args)),
        );
    }

    fn set_model(&self, args: &str) {
        let current = self.settings.settings();
        if args.is_empty() {
            println!("Model: {}", current.effective_model());
            return;
        }
        self.save_settings(
            Settings {
                selected_model: args.to_string(),
                ..current
            },
            &format!("Model set to {}", args),
        );
    }

    fn save_settings(&self, settings: Settings, confirmation: &str) {
        match self.settings.save(&settings) {
            Ok(()) => println!("{}", ConsoleFormatter::notice(confirmation)),
            Err(e) => println!("{}", ConsoleFormatter::error(&e.to_string())),
        }
    }
}

fn prompt() -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    write!(stdout, "> ")?;
    stdout.flush()
}

/// Read stdin lines on a separate task so the loop can keep applying updates.
fn spawn_line_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("Failed to read input: {}", e);
                    break;
                }
            }
        }
    });
    rx
}
