// Copyright (c) 2026 Hierarchy Killer contributors
// SPDX-License-Identifier: MIT

//! Replay a hierarchy scenario against the engine

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use hierarchy_killer_core::domain::config::KillerConfigManifest;
use hierarchy_killer_core::domain::events::HierarchyEvent;
use hierarchy_killer_core::domain::run::RunResult;
use hierarchy_killer_core::HierarchyKillerService;

use crate::scenario::{Scenario, SimulationReport};

#[derive(Args)]
pub struct SimulateCommand {
    /// Scenario file (YAML)
    #[arg(value_name = "FILE")]
    pub scenario: PathBuf,

    /// Deliver a completion for every aborted build, so aborts cascade
    #[arg(long)]
    pub cascade: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(command: SimulateCommand, config_override: Option<PathBuf>) -> Result<()> {
    let config = KillerConfigManifest::load_or_default(config_override)
        .context("Failed to load configuration")?;
    config
        .validate()
        .context("Configuration validation failed")?;

    let scenario = Scenario::from_yaml_file(&command.scenario)?;
    info!(
        runs = scenario.runs.len(),
        steps = scenario.steps.len(),
        "Replaying scenario {:?}",
        command.scenario
    );

    let service = Arc::new(HierarchyKillerService::new(config));
    service.initialize();
    let report = scenario.replay(service.clone(), command.cascade)?;
    service.shutdown();

    if command.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn print_report(report: &SimulationReport) {
    println!("{}", "Events:".bold());
    for event in &report.events {
        println!("  {}", describe(event));
    }
    println!();

    println!("{}", "Runs:".bold());
    for run in &report.runs {
        let result = match run.result {
            Some(RunResult::Success) => "SUCCESS".green(),
            Some(RunResult::Unstable) => "UNSTABLE".yellow(),
            Some(RunResult::Aborted) => "ABORTED".red().bold(),
            Some(other) => other.as_str().red(),
            None => "(none)".dimmed(),
        };
        let state = if run.active { "running".cyan() } else { "stopped".dimmed() };
        println!("  {} {} [{}]", run.id.as_str().bold(), result, state);
        if let Some(reason) = &run.reason {
            println!("    reason: {}", reason.trim_start_matches(", "));
        }
        if run.interrupts > 1 {
            println!("    {}", format!("interrupted {} times", run.interrupts).yellow());
        }
        for line in &run.console {
            println!("    {} {}", "|".dimmed(), line);
        }
    }
    println!();

    println!("{}", "Stats:".bold());
    println!("  Aborts: {}", report.stats.aborts);
    println!("  Still tracked: {}", report.stats.tracked_runs);
    println!(
        "  Cascade: {}",
        if report.cascade { "on" } else { "off (one hop)" }
    );
}

fn describe(event: &HierarchyEvent) -> String {
    match event {
        HierarchyEvent::RunRegistered { run_id, registered_at } => {
            format!("{} {} registered", stamp(registered_at), run_id)
        }
        HierarchyEvent::RunLinked { run_id, upstream, linked_at } => {
            format!("{} {} linked under {}", stamp(linked_at), run_id, upstream)
        }
        HierarchyEvent::PropagationTriggered {
            run_id,
            result,
            upstream,
            downstream,
            triggered_at,
        } => format!(
            "{} {} finished {} (upstream: {}, downstream: {})",
            stamp(triggered_at),
            run_id,
            result,
            upstream,
            downstream
        ),
        HierarchyEvent::RunAborted {
            run_id,
            trigger,
            aborted_at,
            ..
        } => format!(
            "{} {} {} by {}",
            stamp(aborted_at),
            run_id,
            "aborted".red(),
            trigger
        ),
        HierarchyEvent::RunDeregistered {
            run_id,
            cause,
            deregistered_at,
        } => format!("{} {} deregistered ({:?})", stamp(deregistered_at), run_id, cause),
    }
}

fn stamp(at: &chrono::DateTime<chrono::Utc>) -> colored::ColoredString {
    at.format("%H:%M:%S%.3f").to_string().dimmed()
}
