// Copyright (c) 2026 Hierarchy Killer contributors
// SPDX-License-Identifier: MIT

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use hierarchy_killer_core::domain::config::{KillerConfigManifest, CONFIG_PATH_ENV, VERBOSITY_ENV};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./hierarchy-killer.yaml)
        #[arg(short, long, default_value = "./hierarchy-killer.yaml")]
        output: PathBuf,

        /// Include examples and comments
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, examples } => generate(output, examples).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = KillerConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        match &config_override {
            Some(path) => println!("  --config flag: {}", path.display()),
            None => println!("  --config flag: {}", "(not set)".dimmed()),
        }
        for (index, path) in KillerConfigManifest::search_paths().iter().enumerate() {
            let marker = if path.exists() { "found".green() } else { "missing".dimmed() };
            println!("  {}. {} [{}]", index + 1, path.display(), marker);
        }
        println!(
            "  ({}: {})",
            CONFIG_PATH_ENV,
            std::env::var(CONFIG_PATH_ENV)
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!();

    println!("{}", "Manifest:".bold());
    println!("  Name: {}", config.metadata.name);
    if let Some(labels) = &config.metadata.labels {
        let mut labels: Vec<_> = labels.iter().collect();
        labels.sort();
        for (key, value) in labels {
            println!("  Label: {}={}", key, value);
        }
    }
    println!();

    println!("{}", "Build Consoles:".bold());
    println!(
        "  Verbosity: {:?} (override: {})",
        config.spec.listener.verbosity, VERBOSITY_ENV
    );
    println!("  Prefix: {:?}", config.spec.listener.prefix);
    println!("  Server URL variable: {}", config.spec.server_url_variable);
    println!();

    println!("{}", "Observability:".bold());
    println!("  Event bus capacity: {}", config.spec.event_bus.capacity);
    match config.logging() {
        Some(logging) => println!("  Logging: {} ({})", logging.level, logging.format),
        None => println!("  Logging: {}", "(cli defaults)".dimmed()),
    }
    println!(
        "  Metrics: {}",
        if config.metrics_enabled() { "enabled".green() } else { "disabled".yellow() }
    );
    println!();

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = KillerConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf, with_examples: bool) -> Result<()> {
    let sample = if with_examples {
        include_str!("../../templates/config-with-examples.yaml")
    } else {
        include_str!("../../templates/config-minimal.yaml")
    };

    std::fs::write(&output, sample)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}
