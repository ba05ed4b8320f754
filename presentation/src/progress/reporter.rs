//! Spinner shown while a document is streaming

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use visualizer_domain::model_display_name;

/// Reports streaming progress with a spinner and a byte count
pub struct StreamProgress {
    enabled: bool,
    bar: Option<ProgressBar>,
}

impl StreamProgress {
    pub fn new(enabled: bool) -> Self {
        Self { enabled, bar: None }
    }

    /// A reporter that never draws anything
    pub fn hidden() -> Self {
        Self::new(false)
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold} {msg} {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    pub fn is_active(&self) -> bool {
        self.bar.is_some()
    }

    /// Start a new spinner, replacing any previous one
    pub fn start(&mut self, model: &str) {
        self.finish();
        if !self.enabled {
            return;
        }
        let bar = ProgressBar::new_spinner();
        bar.set_style(Self::spinner_style());
        bar.set_prefix(model_display_name(model).to_string());
        bar.set_message("waiting for the first fragment...");
        bar.enable_steady_tick(Duration::from_millis(100));
        self.bar = Some(bar);
    }

    pub fn set_bytes(&self, bytes: usize) {
        if let Some(bar) = &self.bar {
            bar.set_message(format!("{} bytes", bytes.to_string().cyan()));
        }
    }

    /// Print a line without tearing the spinner
    pub fn println(&self, line: impl AsRef<str>) {
        match &self.bar {
            Some(bar) => bar.println(line.as_ref()),
            None => println!("{}", line.as_ref()),
        }
    }

    pub fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

impl Drop for StreamProgress {
    fn drop(&mut self) {
        self.finish();
    }
}
