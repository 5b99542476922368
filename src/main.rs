//! Authorcheck CLI - classify text as human- or AI-written and audit past results

mod commands;

use authorcheck::config;
use authorcheck::ui;
use authorcheck::{DetectorConfig, Registry};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "authorcheck")]
#[command(version)]
#[command(about = "Human vs AI authorship detector with an auditable classification log")]
#[command(long_about = r#"
Authorcheck scores a text sample with a pre-trained classifier and records
every result in a local SQLite database.

Example usage:
  authorcheck classify --model "Random Forest" --file abstract.txt
  authorcheck history --limit 20
  authorcheck delete 4 7
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file (defaults to ./authorcheck.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputMode::Human)]
    format: OutputMode,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn is_human(&self) -> bool {
        matches!(self, OutputMode::Human)
    }
}

/// Print a JSON success envelope for `command`
pub fn emit_success(mode: OutputMode, command: &str, data: serde_json::Value) -> anyhow::Result<()> {
    if mode.is_human() {
        return Ok(());
    }
    let envelope = serde_json::json!({
        "ok": true,
        "command": command,
        "data": data,
    });
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

#[derive(Subcommand)]
enum Commands {
    /// Score a text sample and log the result
    Classify {
        /// Model display name, e.g. "Random Forest"
        #[arg(short, long)]
        model: String,

        /// Text to analyze
        #[arg(short, long, conflicts_with = "file")]
        text: Option<String>,

        /// Read the text from a file (stdin is used when neither is given)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Score only, do not write to the history log
        #[arg(long)]
        no_log: bool,
    },

    /// Show logged classifications, newest first
    History {
        /// Maximum number of rows
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Delete history entries by id
    Delete {
        /// Entry ids
        #[arg(required = true)]
        ids: Vec<i64>,
    },

    /// Show which model artifacts loaded
    Models,

    /// Show statistics about the classification log
    Stats,

    /// Write a default config file and create the database directory
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

fn resolve_config(path: Option<&Path>) -> anyhow::Result<(DetectorConfig, PathBuf)> {
    let config_path = path.map(Path::to_path_buf).unwrap_or_else(config::default_config_path);
    let loaded = config::load_config(Some(&config_path))?;
    if loaded.is_none() && path.is_some() {
        anyhow::bail!("config file not found: {}", config_path.display());
    }

    // Relative locations in the config are resolved next to the config file
    let base = match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir()?,
    };
    Ok((loaded.unwrap_or_default(), base))
}

/// Log level used when `RUST_LOG` is unset
fn default_log_level(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "warn" }
}

fn main() {
    if let Err(e) = run() {
        ui::error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_log_level(cli.verbose)));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let mode = cli.format;
    let config_path = cli.config;
    let registry = || -> anyhow::Result<Registry> {
        let (detector_config, base) = resolve_config(config_path.as_deref())?;
        tracing::debug!("Resolving paths against {}", base.display());
        Ok(Registry::from_config(&detector_config, &base))
    };

    match cli.command {
        Commands::Classify {
            model,
            text,
            file,
            no_log,
        } => {
            let text = commands::read_input(text, file.as_deref())?;
            commands::run_classify(mode, &registry()?, &model, &text, !no_log)
        }
        Commands::History { limit } => commands::run_history(mode, &registry()?, limit),
        Commands::Delete { ids } => commands::run_delete(mode, &registry()?, &ids),
        Commands::Models => commands::run_models(mode, &registry()?),
        Commands::Stats => commands::run_stats(mode, &registry()?),
        Commands::Init { force } => {
            let path = config_path
                .clone()
                .unwrap_or_else(config::default_config_path);
            commands::run_init(mode, &path, force)
        }
    }
}
