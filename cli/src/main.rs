//! CLI entrypoint for Experiment Visualizer
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use visualizer_application::{
    ConversationStore, InMemoryConversationStore, InMemorySettings, SessionController,
    SessionDependencies, SettingsSource, SettingsStore,
};
use visualizer_infrastructure::{
    ConfigLoader, FileConfig, JsonFileConversationStore, JsonlTranscriptLogger, OpenRouterClient,
    OpenRouterConfig, TomlSettingsStore,
};
use visualizer_presentation::{ChatRepl, Cli, OneShot, OutputConfig, StreamProgress};

const PREVIEW_FILE_NAME: &str = "preview.html";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_deref());
        return Ok(());
    }

    let _log_guard = init_logging(cli.verbose, cli.log_file.as_deref())?;
    info!("Starting Experiment Visualizer");

    // === Configuration ===
    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref())
            .map_err(|e| anyhow!("Failed to load configuration: {}", e))?
    };
    config.validate().context("Invalid configuration")?;
    colored::control::set_override(config.output.color);

    let data_dir = config.storage.resolve_data_dir();
    if data_dir.is_none() && !cli.ephemeral {
        bail!("Could not determine a data directory. Set storage.data_dir or use --ephemeral.");
    }

    // === Dependency Injection ===
    let storage = build_storage(data_dir.as_deref(), cli.ephemeral);
    let client = OpenRouterClient::new(OpenRouterConfig::from(&config.api))
        .context("Failed to create the completion client")?;

    let (tx, events) = mpsc::unbounded_channel();
    let (mut controller, updates) = SessionController::new(
        SessionDependencies {
            completion_client: Arc::new(client),
            settings: storage.settings_source,
            store: storage.conversations,
        },
        tx,
    );
    if let Some(path) = &config.log.transcript {
        match JsonlTranscriptLogger::open(path) {
            Some(logger) => controller = controller.with_transcript_logger(Arc::new(logger)),
            None => warn!("Transcript disabled: cannot open {}", path.display()),
        }
    }

    // === One-shot mode ===
    if let Some(prompt) = cli.prompt.as_deref() {
        drop(events);
        let model = storage.settings_store.settings().effective_model().to_string();
        OneShot::new(controller, updates)
            .with_progress(StreamProgress::new(!cli.quiet))
            .run(prompt, &model, cli.output.as_deref())
            .await?;
        return Ok(());
    }

    // === Interactive mode ===
    let output = OutputConfig {
        color: config.output.color,
        show_progress: !cli.quiet,
        preview_file: preview_file(&config, data_dir.as_deref()),
    };
    ChatRepl::new(controller, updates, events, storage.settings_store, &output)
        .run()
        .await?;

    Ok(())
}

/// Initialize logging based on verbosity level, optionally teeing into a file.
fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    let (file_layer, guard) = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(file_layer)
        .init();

    Ok(guard)
}

/// Settings and conversation storage handed to the session
struct Storage {
    settings_source: Arc<dyn SettingsSource>,
    settings_store: Arc<dyn SettingsStore>,
    conversations: Arc<dyn ConversationStore>,
}

/// Conversation store and settings, on disk or in memory.
fn build_storage(data_dir: Option<&Path>, ephemeral: bool) -> Storage {
    match data_dir {
        Some(dir) if !ephemeral => {
            info!("Data directory: {}", dir.display());
            let settings = Arc::new(TomlSettingsStore::in_dir(dir));
            Storage {
                settings_source: settings.clone(),
                settings_store: settings,
                conversations: Arc::new(JsonFileConversationStore::in_dir(dir)),
            }
        }
        _ => {
            info!("Ephemeral session: nothing is written to disk");
            let settings = Arc::new(InMemorySettings::default());
            Storage {
                settings_source: settings.clone(),
                settings_store: settings,
                conversations: Arc::new(InMemoryConversationStore::new()),
            }
        }
    }
}

fn preview_file(config: &FileConfig, data_dir: Option<&Path>) -> Option<PathBuf> {
    config
        .output
        .preview_file
        .clone()
        .or_else(|| data_dir.map(|dir| dir.join(PREVIEW_FILE_NAME)))
}
