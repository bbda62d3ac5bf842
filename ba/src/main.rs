//! BacklogAssist - backlog planning assistant
//!
//! CLI entry point for chatting with the turn core and inspecting its parts.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use serde_json::Value;
use tracing::{debug, info};

use backlogassist::cli::{Cli, Command, OutputFormat};
use backlogassist::config::Config;
use backlogassist::executor::DryRunExecutor;
use backlogassist::handler::TurnHandler;
use backlogassist::repl::ChatSession;
use backlogassist::{Narrator, classify};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("backlogassist")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("ba.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Chat { message } => cmd_chat(&config, message.as_deref()),
        Command::Classify { text, format } => cmd_classify(&text, format),
        Command::Narrate { file } => cmd_narrate(&config, &file),
    }
}

fn cmd_chat(config: &Config, message: Option<&str>) -> Result<()> {
    debug!(single = message.is_some(), "cmd_chat: called");
    let mut session = ChatSession::new(TurnHandler::from_config(config), Arc::new(DryRunExecutor));

    match message {
        Some(message) => {
            let reply = session.turn(message)?;
            println!("{}", reply);
            Ok(())
        }
        None => session.run(),
    }
}

fn cmd_classify(text: &str, format: OutputFormat) -> Result<()> {
    debug!(%format, "cmd_classify: called");
    let classification = classify(text)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&classification)?);
        }
        OutputFormat::Text => {
            println!("{} {}", "Intent:".bold(), classification.intent);
            println!("{} {:.2}", "Confidence:".bold(), classification.confidence);
            println!("{} {}", "Ambiguity:".bold(), classification.ambiguity);
            println!("{}", "Scores:".bold());
            for (intent, hits) in &classification.scores {
                println!("  {:18} {}", intent.as_str(), hits);
            }
        }
    }
    Ok(())
}

fn cmd_narrate(config: &Config, file: &Path) -> Result<()> {
    debug!(file = %file.display(), "cmd_narrate: called");
    let content = fs::read_to_string(file).context(format!("Failed to read {}", file.display()))?;
    let value: Value = serde_json::from_str(&content).context("Failed to parse steps file")?;
    let Value::Array(steps) = value else {
        return Err(eyre::eyre!("{} must hold a JSON array of steps", file.display()));
    };

    let narrator: Narrator = config.narrator.narrator();
    println!("{}", narrator.narrate(&steps)?);
    Ok(())
}
