// Copyright (c) 2026 Hierarchy Killer contributors
// SPDX-License-Identifier: MIT

//! Scenario files for `hkiller simulate`
//!
//! A scenario declares a set of builds and an ordered list of host
//! notifications to replay against the engine:
//!
//! ```yaml
//! cascade: false
//! runs:
//!   - id: pipeline/42
//!     env:
//!       ENABLE_HIERARCHY_KILLER: "true"
//!       HIERARCHY_KILLER_KILL_DOWNSTREAM: "true"
//!   - id: tests/7
//!     env:
//!       ENABLE_HIERARCHY_KILLER: "true"
//!     causes:
//!       - kind: upstream
//!         run: pipeline/42
//! steps:
//!   - action: start
//!     run: pipeline/42
//!   - action: start
//!     run: tests/7
//!   - action: complete
//!     run: pipeline/42
//!     result: FAILURE
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use hierarchy_killer_core::domain::events::HierarchyEvent;
use hierarchy_killer_core::domain::run::{Cause, EnvVars, RunId, RunResult};
use hierarchy_killer_core::infrastructure::simulation::{SimulatedHost, SimulatedRun};
use hierarchy_killer_core::infrastructure::telemetry::EngineStats;
use hierarchy_killer_core::HierarchyKillerService;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Run '{0}' is declared more than once")]
    DuplicateRun(RunId),

    #[error("Step {step} refers to undeclared run '{run}'")]
    UndeclaredRun { step: usize, run: RunId },

    #[error("Scenario has no steps")]
    NoSteps,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Re-deliver completion for every aborted build
    #[serde(default)]
    pub cascade: bool,

    pub runs: Vec<RunSpec>,

    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSpec {
    pub id: RunId,

    /// Build URL relative to the server (default: `<id>/`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default)]
    pub env: EnvVars,

    /// Make environment resolution fail with this message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_error: Option<String>,

    #[serde(default)]
    pub causes: Vec<Cause>,
}

impl RunSpec {
    fn build(&self) -> SimulatedRun {
        let mut builder = SimulatedRun::builder(self.id.as_str()).environment(self.env.clone());
        if let Some(url) = &self.url {
            builder = builder.url(url.clone());
        }
        if let Some(message) = &self.env_error {
            builder = builder.environment_error(message.clone());
        }
        for cause in &self.causes {
            builder = builder.cause(cause.clone());
        }
        builder.build()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Start {
        run: RunId,
    },
    Complete {
        run: RunId,
        result: RunResult,
        /// Finalize right after completion
        #[serde(default = "default_finalize")]
        finalize: bool,
    },
    Finalize {
        run: RunId,
    },
}

fn default_finalize() -> bool {
    true
}

impl Step {
    pub fn run(&self) -> &RunId {
        match self {
            Step::Start { run } | Step::Complete { run, .. } | Step::Finalize { run } => run,
        }
    }
}

/// Final state of one build after the replay.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub id: RunId,
    pub result: Option<RunResult>,
    pub active: bool,
    pub interrupts: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub console: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub cascade: bool,
    pub events: Vec<HierarchyEvent>,
    pub runs: Vec<RunReport>,
    pub stats: EngineStats,
}

impl SimulationReport {
    pub fn run(&self, id: &str) -> Option<&RunReport> {
        self.runs.iter().find(|run| run.id.as_str() == id)
    }
}

impl Scenario {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {:?}", path))?;
        Self::from_yaml_str(&content).with_context(|| format!("Invalid scenario {:?}", path))
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let scenario: Scenario = serde_yaml::from_str(yaml)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn validate(&self) -> Result<(), ScenarioError> {
        let mut seen = HashSet::new();
        for spec in &self.runs {
            if !seen.insert(&spec.id) {
                return Err(ScenarioError::DuplicateRun(spec.id.clone()));
            }
        }
        if self.steps.is_empty() {
            return Err(ScenarioError::NoSteps);
        }
        for (index, step) in self.steps.iter().enumerate() {
            if !seen.contains(step.run()) {
                return Err(ScenarioError::UndeclaredRun {
                    step: index + 1,
                    run: step.run().clone(),
                });
            }
        }
        Ok(())
    }

    /// Replay every step against `service` through a simulated host.
    /// `cascade` is or-ed with the scenario's own setting.
    pub fn replay(&self, service: Arc<HierarchyKillerService>, cascade: bool) -> Result<SimulationReport> {
        let cascade = cascade || self.cascade;
        let mut events = service.subscribe();
        let host = SimulatedHost::new(service.clone(), cascade);
        let specs: HashMap<&RunId, &RunSpec> = self.runs.iter().map(|spec| (&spec.id, spec)).collect();
        let mut collected = Vec::new();

        for (index, step) in self.steps.iter().enumerate() {
            debug!(step = index + 1, ?step, "Replaying step");
            match step {
                Step::Start { run } => {
                    let spec = specs.get(run).ok_or_else(|| ScenarioError::UndeclaredRun {
                        step: index + 1,
                        run: run.clone(),
                    })?;
                    host.start(spec.build());
                }
                Step::Complete { run, result, finalize: true } => host
                    .complete(run, *result)
                    .with_context(|| format!("Step {} failed", index + 1))?,
                Step::Complete { run, result, finalize: false } => host
                    .complete_without_finalize(run, *result)
                    .with_context(|| format!("Step {} failed", index + 1))?,
                Step::Finalize { run } => host
                    .finalize(run)
                    .with_context(|| format!("Step {} failed", index + 1))?,
            }
            collected.extend(events.drain());
        }

        let reasons: BTreeMap<RunId, String> = collected
            .iter()
            .filter_map(|event| match event {
                HierarchyEvent::RunAborted { run_id, reason, .. } => Some((run_id.clone(), reason.clone())),
                _ => None,
            })
            .collect();

        let runs = host
            .outcomes()
            .into_iter()
            .map(|outcome| RunReport {
                reason: reasons.get(&outcome.id).cloned(),
                id: outcome.id,
                result: outcome.result,
                active: outcome.active,
                interrupts: outcome.interrupts,
                console: outcome.console,
            })
            .collect();

        Ok(SimulationReport {
            cascade,
            events: collected,
            runs,
            stats: service.stats(),
        })
    }
}
