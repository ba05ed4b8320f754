//! CLI command definitions

use clap::Parser;
use std::path::PathBuf;

/// CLI arguments for experiment-visualizer
#[derive(Parser, Debug)]
#[command(name = "experiment-visualizer")]
#[command(author, version, about = "Turn a knowledge point into an interactive HTML visualization")]
#[command(long_about = r#"
Experiment Visualizer asks a language model to write a self-contained,
interactive HTML page that illustrates a concept, and streams the page
into a preview file while it is being written.

With a PROMPT, the document is generated once and written to --output
(or stdout). Without one, an interactive session starts; type a concept
to visualize it, or /help for commands.

Configuration files are loaded from (in priority order):
1. --config <path>          Explicit config file
2. ./visualizer.toml        Project-level config
3. ~/.config/experiment-visualizer/config.toml   Global config

The API key and model are kept in settings.toml in the data directory
(set them with /key and /model), or taken from VISUALIZER_API_KEY and
VISUALIZER_SELECTED_MODEL.

Example:
  experiment-visualizer "Newton's second law"
  experiment-visualizer -o pendulum.html "Simple pendulum"
  experiment-visualizer -v
"#)]
pub struct Cli {
    /// Concept to visualize once (omit for an interactive session)
    pub prompt: Option<String>,

    /// Write the generated document here instead of stdout (one-shot mode)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,

    /// Also write diagnostic logs to this file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Keep conversations and settings in memory only
    #[arg(long)]
    pub ephemeral: bool,
}
