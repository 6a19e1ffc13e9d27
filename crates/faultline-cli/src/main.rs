//! Faultline CLI - Command-line interface for the capture pipeline
//!
//! Provides commands for:
//! - Showing and validating the configuration
//! - Replaying a recorded signal stream through the pipeline
//! - Inspecting and cleaning the envelope outbox

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use faultline_core::config::Config;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{config::ConfigCommand, outbox::OutboxCommand, replay::ReplayCommand};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "faultline", version, about = "Diagnostic-event capture pipeline")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// View and validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Replay recorded signals through the pipeline
    Replay(ReplayCommand),
    /// Inspect envelopes written to the outbox
    #[command(subcommand)]
    Outbox(OutboxCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = Config::load_or_default(&config_path);

    // Without -v the configured diagnostic level applies
    let filter = match cli.verbose {
        0 => config.log_filter(),
        1 => "faultline=debug".to_string(),
        _ => "trace".to_string(),
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    match cli.command {
        Commands::Config(cmd) => cmd.execute(&config_path, format).await,
        Commands::Replay(cmd) => cmd.execute(config, format).await,
        Commands::Outbox(cmd) => cmd.execute(&config, format).await,
    }
}
