//! One-shot mode: generate a single document and exit

use crate::progress::reporter::StreamProgress;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use thiserror::Error;
use visualizer_application::{SessionController, StreamUpdates};

/// Why a one-shot run produced no document
#[derive(Error, Debug)]
pub enum OneShotError {
    #[error("Prompt is empty")]
    EmptyPrompt,

    #[error("{0}")]
    Failed(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("Failed to write document: {0}")]
    Io(#[from] io::Error),
}

/// Sends one prompt and drives its stream to the end
pub struct OneShot {
    controller: SessionController,
    updates: StreamUpdates,
    progress: StreamProgress,
}

impl OneShot {
    pub fn new(controller: SessionController, updates: StreamUpdates) -> Self {
        Self {
            controller,
            updates,
            progress: StreamProgress::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: StreamProgress) -> Self {
        self.progress = progress;
        self
    }

    /// Generate the document for `prompt` and write it to `output`, or stdout.
    pub async fn run(
        mut self,
        prompt: &str,
        model: &str,
        output: Option<&Path>,
    ) -> Result<(), OneShotError> {
        let document = self.generate(prompt.trim(), model).await?;

        match output {
            Some(path) => {
                if let Some(parent) = path.parent()
                    && !parent.as_os_str().is_empty()
                {
                    fs::create_dir_all(parent)?;
                }
                fs::write(path, &document)?;
                eprintln!("Wrote {} bytes to {}", document.len(), path.display());
            }
            None => {
                let mut stdout = io::stdout().lock();
                stdout.write_all(document.as_bytes())?;
                stdout.write_all(b"\n")?;
                stdout.flush()?;
            }
        }
        Ok(())
    }

    async fn generate(&mut self, prompt: &str, model: &str) -> Result<String, OneShotError> {
        if self.controller.send_message(prompt).is_none() {
            return Err(OneShotError::EmptyPrompt);
        }
        self.progress.start(model);

        while self.controller.is_streaming() {
            tokio::select! {
                biased;
                _ = tokio::signal::ctrl_c() => {
                    self.controller.cancel_streaming();
                    self.progress.finish();
                    return Err(OneShotError::Cancelled);
                }
                update = self.updates.recv() => match update {
                    Some(update) => {
                        self.controller.apply_stream_update(update);
                        self.progress.set_bytes(self.controller.streamed_bytes());
                    }
                    None => break,
                },
            }
        }
        self.progress.finish();

        let state = self.controller.state();
        if let Some(error) = state.error_message() {
            return Err(OneShotError::Failed(error.to_string()));
        }
        Ok(state.current_content().to_string())
    }
}
