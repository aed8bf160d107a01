// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Screenshot Renamer CLI
//!
//! Finds unrenamed screenshots in a directory and renames each one to
//! `screenshot_<date>-<description>.png` using local AI models.

use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use screenshot_renamer::caption::setup_backends;
use screenshot_renamer::config::AppConfig;
use screenshot_renamer::history::History;
use screenshot_renamer::metadata::ExifTool;
use screenshot_renamer::ocr::TesseractOcr;
use screenshot_renamer::ollama::{
    model_in_list, resolve_text_model, GenerateOptions, OllamaClient, OllamaTextModel,
    TextGenerator,
};
use screenshot_renamer::pipeline::{ProcessOutcome, Renamer, RenamerOptions};
use screenshot_renamer::progress::{format_preview, should_use_color};
use screenshot_renamer::{selftest, RenamerError, Result};

/// Screenshot Renamer - descriptive names for screenshots via local AI
#[derive(Parser, Debug)]
#[command(name = "screenshot-renamer")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version)]
#[command(about = "Batch rename screenshots using OCR, captions and a local LLM", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable ANSI color output
    #[arg(long, global = true)]
    no_color: bool,

    /// Output format for results
    #[arg(long, global = true, default_value = "text", value_parser = ["text", "json", "jsonl"])]
    format: String,

    /// Directory containing screenshots (default: ~/Desktop)
    #[arg(short, long)]
    directory: Option<PathBuf>,

    /// Perform a dry run without modifying files
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Run a self-test (ask the LLM to add two numbers)
    #[arg(short = 't', long)]
    unit_test: bool,

    /// Custom captioning prompt applied to every caption model
    #[arg(long)]
    caption_prompt: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show AI engine status
    Status,

    /// History and undo operations
    History {
        #[command(subcommand)]
        action: HistoryCommands,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum HistoryCommands {
    /// List recent history entries
    List {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value = "10")]
        count: usize,
    },

    /// Undo recent renames
    Undo {
        /// Number of renames to undo
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,

        /// Dry run (show what would be undone)
        #[arg(long)]
        dry_run: bool,
    },

    /// Clear all history
    Clear {
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        /// Output file path (default: the standard config location)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    // Logs on stderr, results on stdout
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(should_use_color(cli.no_color))
        .init();

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_path);
    let config = AppConfig::load(&config_path)?;

    match cli.command.take() {
        Some(Commands::Status) => run_status(&config).await,
        Some(Commands::History { action }) => run_history_command(&config, action),
        Some(Commands::Config { action }) => run_config_command(&config, action, &config_path),
        None if cli.unit_test => run_self_test(&config).await,
        None => run_rename(&cli, &config).await,
    }
}

fn ollama_client(config: &AppConfig) -> Result<OllamaClient> {
    OllamaClient::new(
        &config.ai_engine.url,
        Duration::from_secs(config.ai_engine.timeout_secs),
    )
}

async fn text_model(client: &OllamaClient, config: &AppConfig) -> Result<OllamaTextModel> {
    let model = resolve_text_model(client, &config.ai_engine.models.text).await?;
    let options = GenerateOptions {
        system: Some(config.prompts.filename_system.clone()),
        temperature: Some(0.2),
        num_predict: Some(120),
    };
    Ok(OllamaTextModel::new(client.clone(), model, options, config.ai_engine.retries))
}

/// Run the batch rename
async fn run_rename(cli: &Cli, config: &AppConfig) -> Result<()> {
    let directory = cli
        .directory
        .clone()
        .or_else(dirs::desktop_dir)
        .unwrap_or_else(|| PathBuf::from("."));

    if cli.dry_run {
        warn!("DRY RUN MODE - files will not be renamed");
    }

    let client = ollama_client(config)?;
    info!("Checking Ollama availability...");
    client.health_check().await.map_err(|e| {
        RenamerError::OllamaUnavailable(format!("{}. Try: ollama serve", e))
    })?;

    let ocr = TesseractOcr::new(&config.ocr);
    if !ocr.is_available() {
        return Err(RenamerError::Ocr(format!(
            "'{}' not found; install Tesseract or set ocr.binary",
            config.ocr.binary
        )));
    }

    let captioners = setup_backends(&client, config, cli.caption_prompt.as_deref()).await?;
    let model = text_model(&client, config).await?;
    info!("Filename model: {}", model.name());

    if let Some(prompt) = &cli.caption_prompt {
        info!("Custom caption prompt: {}", format_preview(prompt, 3, 80));
    }

    let options = RenamerOptions {
        dry_run: cli.dry_run,
        max_stub_length: config.rules.max_stub_length,
        max_context_chars: config.rules.max_context_chars,
    };
    let mut renamer = Renamer::new(Box::new(ocr), captioners, Box::new(model), options)?
        .with_history(History::new(PathBuf::from(&config.history.path)));
    info!("Caption backends: {}", renamer.captioner_names().join(" + "));

    if config.metadata.enabled {
        let exiftool = ExifTool::new(&config.metadata.exiftool);
        if exiftool.is_available() {
            renamer = renamer.with_metadata(Box::new(exiftool));
        } else {
            warn!("'{}' not found; metadata will not be written", config.metadata.exiftool);
        }
    }

    let outcomes = renamer.run(&directory).await?;
    print_outcomes(&mut std::io::stdout().lock(), &outcomes, &cli.format)
}

fn print_outcomes(out: &mut impl Write, outcomes: &[ProcessOutcome], format: &str) -> Result<()> {
    match format {
        "json" => writeln!(out, "{}", serde_json::to_string_pretty(outcomes)?)?,
        "jsonl" => {
            for outcome in outcomes {
                writeln!(out, "{}", serde_json::to_string(outcome)?)?;
            }
        }
        _ => {
            for outcome in outcomes {
                let verb = if outcome.renamed { "Renamed" } else { "Would rename" };
                writeln!(
                    out,
                    "{}: {} -> {}",
                    verb,
                    outcome.original_path.display(),
                    outcome.new_path.display()
                )?;
            }
        }
    }
    Ok(())
}

/// Check the text model with a simple sum
async fn run_self_test(config: &AppConfig) -> Result<()> {
    let client = ollama_client(config)?;
    client.health_check().await?;
    let model = text_model(&client, config).await?;
    selftest::run(&model).await
}

/// Run status check
async fn run_status(config: &AppConfig) -> Result<()> {
    let client = ollama_client(config)?;

    println!("Screenshot Renamer v{} Status", env!("CARGO_PKG_VERSION"));
    println!("==============================");

    match client.health_check().await {
        Ok(()) => println!("Ollama: Running at {}", client.base_url()),
        Err(e) => println!("Ollama: Error - {}", e),
    }

    match client.list_models().await {
        Ok(models) => {
            println!("\nCaption models:");
            for captioner in &config.ai_engine.captioners {
                let marker = if model_in_list(&models, &captioner.model) { "✓" } else { "✗" };
                println!("  {} {}", marker, captioner.model);
            }
            println!("\nAvailable models:");
            for m in &models {
                println!("    {}", m);
            }
        }
        Err(e) => println!("  Error listing models: {}", e),
    }

    let ocr = TesseractOcr::new(&config.ocr);
    println!("\nTools:");
    println!("  {}: {}", config.ocr.binary, availability(ocr.is_available()));
    let exiftool = ExifTool::new(&config.metadata.exiftool);
    println!("  {}: {}", config.metadata.exiftool, availability(exiftool.is_available()));

    println!("\nConfiguration:");
    println!("  Text model: {}", config.ai_engine.models.text);
    println!("  History: {}", config.history.path);

    Ok(())
}

fn availability(available: bool) -> &'static str {
    if available { "found" } else { "missing" }
}

/// Run history commands
fn run_history_command(config: &AppConfig, action: HistoryCommands) -> Result<()> {
    let history = History::new(PathBuf::from(&config.history.path));

    match action {
        HistoryCommands::List { count } => {
            let entries = history.get_recent(count)?;
            println!("Recent history ({} entries):", entries.len());
            for entry in entries {
                let status = if entry.undone { "[UNDONE]" } else { "" };
                println!("  {} {} -> {} {}",
                    entry.timestamp.format("%Y-%m-%d %H:%M"),
                    entry.original_path.display(),
                    entry.new_path.display(),
                    status
                );
            }
        }
        HistoryCommands::Undo { count, dry_run } => {
            let report = history.undo(count, dry_run)?;
            if report.undone.is_empty() && report.skipped == 0 {
                println!("No renames to undo");
                return Ok(());
            }
            let verb = if dry_run { "Would undo" } else { "Undone" };
            for (from, to) in &report.undone {
                println!("{}: {} -> {}", verb, from.display(), to.display());
            }
            if report.skipped > 0 {
                println!("Skipped {} entries (see warnings)", report.skipped);
            }
        }
        HistoryCommands::Clear { force } => {
            if !force {
                eprintln!("Use --force to confirm clearing history");
                return Ok(());
            }
            history.clear()?;
            println!("History cleared");
        }
    }

    Ok(())
}

/// Run config commands
fn run_config_command(config: &AppConfig, action: ConfigCommands, config_path: &Path) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            println!("# {}", config_path.display());
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        ConfigCommands::Generate { output, force } => {
            let output = output.unwrap_or_else(|| config_path.to_path_buf());
            if output.exists() && !force {
                return Err(RenamerError::Config(format!(
                    "{:?} already exists. Use --force to overwrite",
                    output
                )));
            }
            AppConfig::default().save(&output)?;
            println!("Generated config at {:?}", output);
        }
    }

    Ok(())
}
