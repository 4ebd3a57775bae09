// Copyright (c) 2026 Hierarchy Killer contributors
// SPDX-License-Identifier: MIT

//! # Hierarchy Killer CLI
//!
//! The `hkiller` binary manages engine configuration and replays build
//! hierarchies against the engine with an in-memory host.
//!
//! ## Commands
//!
//! - `hkiller config show|validate|generate` - Configuration management
//! - `hkiller simulate FILE [--cascade]` - Replay a scenario and print what
//!   the engine aborted

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use hierarchy_killer::commands::{self, ConfigCommand, SimulateCommand};
use hierarchy_killer::logging::LogSettings;
use hierarchy_killer_core::domain::config::KillerConfigManifest;

/// Hierarchy Killer - abort related CI builds when one fails
#[derive(Parser)]
#[command(name = "hkiller")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "HIERARCHY_KILLER_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error) [default: config file, then info]
    #[arg(long, global = true, env = "HIERARCHY_KILLER_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Replay a hierarchy scenario
    #[command(name = "simulate")]
    Simulate(SimulateCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // A broken config file is reported by the command itself; log with the
    // defaults until then.
    let config = KillerConfigManifest::load_or_default(cli.config.clone()).ok();
    init_logging(&LogSettings::resolve(cli.log_level.as_deref(), config.as_ref()))?;

    match cli.command {
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, cli.config).await
        }
        Some(Commands::Simulate(command)) => commands::simulate::execute(command, cli.config).await,
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(settings: &LogSettings) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&settings.level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if settings.json {
        builder.json().init();
    } else {
        builder.compact().init();
    }

    Ok(())
}
