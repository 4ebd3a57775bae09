// Copyright (c) 2026 Hierarchy Killer contributors
// SPDX-License-Identifier: MIT
//! # Simulated Host
//!
//! In-memory implementations of the host collaborator traits, plus a
//! [`SimulatedHost`] that drives the lifecycle hooks the way a CI server
//! would. Used by the test suites and by `hkiller simulate`.
//!
//! A [`SimulatedRun`] stops being active when it is finished or interrupted.
//! With cascading enabled, the host delivers a completion (and then a
//! finalization) for every build it was asked to interrupt, which is what
//! lets aborts travel more than one hop through a hierarchy.

use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::application::lifecycle::HierarchyKillerService;
use crate::domain::error::HostError;
use crate::domain::run::{Cause, EnvVars, Run, RunId, RunResult, TaskListener};

/// Listener that keeps every line in memory.
#[derive(Debug, Default)]
pub struct BufferedListener {
    lines: Mutex<Vec<String>>,
}

impl BufferedListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn contains(&self, fragment: &str) -> bool {
        self.lines.lock().iter().any(|line| line.contains(fragment))
    }
}

impl TaskListener for BufferedListener {
    fn log(&self, line: &str) {
        self.lines.lock().push(line.to_string());
    }
}

#[derive(Debug)]
struct SimulatedState {
    active: bool,
    result: Option<RunResult>,
    interrupts: Vec<RunResult>,
}

/// In-memory build execution.
#[derive(Debug)]
pub struct SimulatedRun {
    id: RunId,
    url: String,
    causes: Vec<Cause>,
    environment: Result<EnvVars, String>,
    state: Mutex<SimulatedState>,
}

impl SimulatedRun {
    pub fn builder(id: impl Into<String>) -> SimulatedRunBuilder {
        let id = id.into();
        SimulatedRunBuilder {
            url: format!("{}/", id),
            id: RunId(id),
            causes: Vec::new(),
            environment: Ok(EnvVars::new()),
        }
    }

    /// End the build with `result`.
    pub fn finish(&self, result: RunResult) {
        let mut state = self.state.lock();
        state.active = false;
        if state.result.is_none() {
            state.result = Some(result);
        }
    }

    pub fn interrupts(&self) -> Vec<RunResult> {
        self.state.lock().interrupts.clone()
    }

    pub fn interrupt_count(&self) -> usize {
        self.state.lock().interrupts.len()
    }
}

impl Run for SimulatedRun {
    fn id(&self) -> RunId {
        self.id.clone()
    }

    fn url(&self) -> String {
        self.url.clone()
    }

    fn is_active(&self) -> bool {
        self.state.lock().active
    }

    fn result(&self) -> Option<RunResult> {
        self.state.lock().result
    }

    fn set_result(&self, result: RunResult) {
        self.state.lock().result = Some(result);
    }

    fn interrupt(&self, result: RunResult) {
        let mut state = self.state.lock();
        state.interrupts.push(result);
        state.active = false;
    }

    fn causes(&self) -> Vec<Cause> {
        self.causes.clone()
    }

    fn environment(&self, _listener: &dyn TaskListener) -> Result<EnvVars, HostError> {
        self.environment.clone().map_err(HostError::Environment)
    }
}

pub struct SimulatedRunBuilder {
    id: RunId,
    url: String,
    causes: Vec<Cause>,
    environment: Result<EnvVars, String>,
}

impl SimulatedRunBuilder {
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let Ok(env) = self.environment.as_mut() {
            env.insert(key, value);
        }
        self
    }

    pub fn environment(mut self, env: EnvVars) -> Self {
        self.environment = Ok(env);
        self
    }

    /// Make environment resolution fail with `message`.
    pub fn environment_error(mut self, message: impl Into<String>) -> Self {
        self.environment = Err(message.into());
        self
    }

    pub fn caused_by(mut self, upstream: impl Into<String>) -> Self {
        self.causes.push(Cause::Upstream {
            run: RunId(upstream.into()),
        });
        self
    }

    pub fn cause(mut self, cause: Cause) -> Self {
        self.causes.push(cause);
        self
    }

    pub fn build(self) -> SimulatedRun {
        SimulatedRun {
            id: self.id,
            url: self.url,
            causes: self.causes,
            environment: self.environment,
            state: Mutex::new(SimulatedState {
                active: true,
                result: None,
                interrupts: Vec::new(),
            }),
        }
    }
}

struct HostedRun {
    run: Arc<SimulatedRun>,
    listener: Arc<BufferedListener>,
    finalized: bool,
}

/// Final state of one simulated build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub id: RunId,
    pub result: Option<RunResult>,
    pub active: bool,
    pub interrupts: usize,
    pub console: Vec<String>,
}

/// Drives [`HierarchyKillerService`] the way a CI server would.
pub struct SimulatedHost {
    service: Arc<HierarchyKillerService>,
    runs: Mutex<BTreeMap<RunId, HostedRun>>,
    cascade: bool,
}

impl SimulatedHost {
    pub fn new(service: Arc<HierarchyKillerService>, cascade: bool) -> Self {
        Self {
            service,
            runs: Mutex::new(BTreeMap::new()),
            cascade,
        }
    }

    pub fn service(&self) -> &Arc<HierarchyKillerService> {
        &self.service
    }

    /// Register `run` with the host and notify the engine that it started.
    pub fn start(&self, run: SimulatedRun) -> Arc<SimulatedRun> {
        let run = Arc::new(run);
        let listener = Arc::new(BufferedListener::new());
        self.runs.lock().insert(
            run.id(),
            HostedRun {
                run: run.clone(),
                listener: listener.clone(),
                finalized: false,
            },
        );
        self.service.notify_run_started(run.clone(), listener);
        run
    }

    /// Finish `id` with `result`, notify completion, then finalize.
    pub fn complete(&self, id: &RunId, result: RunResult) -> Result<(), HostError> {
        let (run, _) = self.handles(id)?;
        run.finish(result);
        self.deliver_completion(id)?;
        self.finalize(id)?;
        if self.cascade {
            self.cascade_aborts();
        }
        Ok(())
    }

    /// Notify completion only, leaving finalization to a later step.
    pub fn complete_without_finalize(&self, id: &RunId, result: RunResult) -> Result<(), HostError> {
        let (run, _) = self.handles(id)?;
        run.finish(result);
        self.deliver_completion(id)
    }

    pub fn finalize(&self, id: &RunId) -> Result<(), HostError> {
        let mut runs = self.runs.lock();
        let hosted = runs
            .get_mut(id)
            .ok_or_else(|| HostError::UnknownRun(id.clone()))?;
        hosted.finalized = true;
        drop(runs);
        self.service.notify_run_finalized(id);
        Ok(())
    }

    pub fn run(&self, id: &RunId) -> Option<Arc<SimulatedRun>> {
        self.runs.lock().get(id).map(|hosted| hosted.run.clone())
    }

    pub fn listener(&self, id: &RunId) -> Option<Arc<BufferedListener>> {
        self.runs.lock().get(id).map(|hosted| hosted.listener.clone())
    }

    pub fn outcomes(&self) -> Vec<RunOutcome> {
        self.runs
            .lock()
            .values()
            .map(|hosted| RunOutcome {
                id: hosted.run.id(),
                result: hosted.run.result(),
                active: hosted.run.is_active(),
                interrupts: hosted.run.interrupt_count(),
                console: hosted.listener.lines(),
            })
            .collect()
    }

    fn handles(&self, id: &RunId) -> Result<(Arc<SimulatedRun>, Arc<BufferedListener>), HostError> {
        self.runs
            .lock()
            .get(id)
            .map(|hosted| (hosted.run.clone(), hosted.listener.clone()))
            .ok_or_else(|| HostError::UnknownRun(id.clone()))
    }

    fn deliver_completion(&self, id: &RunId) -> Result<(), HostError> {
        let (run, listener) = self.handles(id)?;
        self.service.notify_run_completed(run.as_ref(), listener.as_ref());
        Ok(())
    }

    // Interrupted builds complete through the same notification path as any
    // other build. Each one is delivered once, then finalized.
    fn cascade_aborts(&self) {
        let mut pending: VecDeque<RunId> = self.interrupted_unfinalized().into();
        while let Some(id) = pending.pop_front() {
            debug!(run_id = %id, "Delivering completion for interrupted run");
            if let Err(e) = self.deliver_completion(&id).and_then(|_| self.finalize(&id)) {
                warn!(run_id = %id, "Cascade delivery failed: {}", e);
                continue;
            }
            for next in self.interrupted_unfinalized() {
                if !pending.contains(&next) {
                    pending.push_back(next);
                }
            }
        }
    }

    fn interrupted_unfinalized(&self) -> Vec<RunId> {
        self.runs
            .lock()
            .values()
            .filter(|hosted| !hosted.finalized && hosted.run.interrupt_count() > 0)
            .map(|hosted| hosted.run.id())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_deactivates_run() {
        let run = SimulatedRun::builder("job/a/1").build();
        assert!(run.is_active());
        run.interrupt(RunResult::Aborted);
        assert!(!run.is_active());
        assert_eq!(run.interrupts(), vec![RunResult::Aborted]);
    }

    #[test]
    fn test_finish_keeps_result_set_by_abort() {
        let run = SimulatedRun::builder("job/a/1").build();
        run.set_result(RunResult::Aborted);
        run.finish(RunResult::Success);
        assert_eq!(run.result(), Some(RunResult::Aborted));
    }

    #[test]
    fn test_environment_error_is_reported() {
        let run = SimulatedRun::builder("job/a/1")
            .environment_error("workspace offline")
            .build();
        let listener = BufferedListener::new();
        assert!(run.environment(&listener).is_err());
    }

    #[test]
    fn test_builder_records_causes_in_order() {
        let run = SimulatedRun::builder("job/c/1")
            .cause(Cause::Timer)
            .caused_by("job/a/1")
            .caused_by("job/b/1")
            .build();
        let upstreams: Vec<_> = run.causes().iter().filter_map(|c| c.upstream_run().cloned()).collect();
        assert_eq!(upstreams, vec![RunId::from("job/a/1"), RunId::from("job/b/1")]);
        assert_eq!(run.url(), "job/c/1/");
    }
}
