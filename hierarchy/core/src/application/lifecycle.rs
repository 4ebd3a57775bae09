// Copyright (c) 2026 Hierarchy Killer contributors
// SPDX-License-Identifier: MIT
//! # Lifecycle Service
//!
//! [`HierarchyKillerService`] is the engine's only entry point for the host.
//! The host calls three hooks, from any thread, in any interleaving across
//! builds:
//!
//! | Hook | Transition |
//! |------|------------|
//! | [`notify_run_started`](HierarchyKillerService::notify_run_started) | UNTRACKED → ACTIVE, iff the build opts in |
//! | [`notify_run_completed`](HierarchyKillerService::notify_run_completed) | ACTIVE → TERMINATED, after optional propagation |
//! | [`notify_run_finalized`](HierarchyKillerService::notify_run_finalized) | any → TERMINATED (idempotent) |
//!
//! Hooks never fail towards the host. Problems are written to tracing and,
//! where a listener is at hand, to the build's console.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use crate::application::console::Console;
use crate::application::linker::HierarchyLinker;
use crate::application::propagator::KillPropagator;
use crate::domain::config::KillerConfigManifest;
use crate::domain::error::HierarchyError;
use crate::domain::events::{DeregistrationCause, HierarchyEvent};
use crate::domain::policy::{self, KillPolicy};
use crate::domain::run::{EnvVars, Run, RunId, TaskListener};
use crate::infrastructure::event_bus::{EventBus, EventReceiver};
use crate::infrastructure::registry::RunRegistry;
use crate::infrastructure::telemetry::{AbortCounter, EngineStats, Telemetry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ServiceState {
    Uninitialized,
    Running,
    Stopped,
}

pub struct HierarchyKillerService {
    config: KillerConfigManifest,
    registry: Arc<RunRegistry>,
    event_bus: EventBus,
    aborts: Arc<AbortCounter>,
    console: Console,
    linker: HierarchyLinker,
    propagator: KillPropagator,
    state: RwLock<ServiceState>,
}

impl HierarchyKillerService {
    /// Build an uninitialized engine. Hooks are ignored until
    /// [`initialize`](Self::initialize) is called.
    pub fn new(config: KillerConfigManifest) -> Self {
        let telemetry = Telemetry::new(config.metrics_enabled());
        let registry = Arc::new(RunRegistry::with_telemetry(telemetry));
        let event_bus = EventBus::new(config.spec.event_bus.capacity.max(1));
        let aborts = Arc::new(AbortCounter::with_telemetry(telemetry));
        let console = Console::new(
            config.spec.listener.clone(),
            config.spec.server_url_variable.clone(),
        );

        Self {
            linker: HierarchyLinker::new(registry.clone(), event_bus.clone(), console.clone()),
            propagator: KillPropagator::new(
                registry.clone(),
                event_bus.clone(),
                aborts.clone(),
                console.clone(),
            ),
            config,
            registry,
            event_bus,
            aborts,
            console,
            state: RwLock::new(ServiceState::Uninitialized),
        }
    }

    pub fn initialize(&self) {
        let mut state = self.state.write();
        if *state == ServiceState::Running {
            warn!("Hierarchy killer already initialized");
            return;
        }
        *state = ServiceState::Running;
        info!(config = %self.config.metadata.name, "Hierarchy killer initialized");
    }

    /// Stop accepting notifications and forget every tracked build.
    pub fn shutdown(&self) {
        *self.state.write() = ServiceState::Stopped;
        let dropped = self.registry.clear();
        for run_id in &dropped {
            self.publish_deregistered(run_id, DeregistrationCause::Shutdown);
        }
        info!(dropped = dropped.len(), "Hierarchy killer stopped");
    }

    pub fn is_initialized(&self) -> bool {
        *self.state.read() == ServiceState::Running
    }

    pub fn config(&self) -> &KillerConfigManifest {
        &self.config
    }

    pub fn registry(&self) -> &Arc<RunRegistry> {
        &self.registry
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.event_bus.subscribe()
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            aborts: self.aborts.get(),
            tracked_runs: self.registry.len(),
        }
    }

    /// Host hook: a build started executing.
    pub fn notify_run_started(&self, run: Arc<dyn Run>, listener: Arc<dyn TaskListener>) {
        if let Err(e) = self.ensure_running() {
            self.console.info(listener.as_ref(), &e.to_string());
            return;
        }

        let env = self.resolve_env(run.as_ref(), listener.as_ref());
        if !policy::is_governed(&env) {
            debug!(run_id = %run.id(), "Run is not governed, not tracking");
            return;
        }

        let outcome = self.linker.link(run, listener, &env);
        let stats = self.stats();
        debug!(?outcome, aborts = stats.aborts, tracked_runs = stats.tracked_runs, "Registration done");
    }

    /// Host hook: a build finished executing and has its final result.
    ///
    /// The entry leaves the registry before anything else happens. A build
    /// that starts while propagation is running can no longer link under
    /// this one, so every child it ever had is in the list being aborted.
    pub fn notify_run_completed(&self, run: &dyn Run, listener: &dyn TaskListener) {
        if let Err(e) = self.ensure_running() {
            self.console.info(listener, &e.to_string());
            return;
        }

        let run_id = run.id();
        let Some(data) = self.registry.unregister(&run_id) else {
            debug!(run_id = %run_id, "Completed run is not tracked");
            return;
        };

        if !data.reason().is_empty() {
            self.console
                .info(listener, &format!("Aborted by HierarchyKiller{}", data.reason()));
        }

        let env = self.resolve_env(run, listener);
        let policy = KillPolicy::from_env(&env);
        if !policy.governed {
            debug!(run_id = %run_id, "Run no longer governed at completion");
            self.publish_deregistered(&run_id, DeregistrationCause::NotGoverned);
            return;
        }

        let Some(result) = run.result() else {
            warn!(run_id = %run_id, "Completed run has no result, skipping kill policy");
            self.publish_deregistered(&run_id, DeregistrationCause::NoResult);
            return;
        };

        match policy.decide(Some(result)) {
            Some(directions) if !directions.is_noop() => {
                info!(run_id = %run_id, %result, ?directions, "Propagating abort");
                self.event_bus.publish(HierarchyEvent::PropagationTriggered {
                    run_id: run_id.clone(),
                    result,
                    upstream: directions.upstream,
                    downstream: directions.downstream,
                    triggered_at: Utc::now(),
                });
                let report = self
                    .propagator
                    .propagate(run, &data, listener, &env, directions);
                debug!(
                    run_id = %run_id,
                    aborted = report.aborted.len(),
                    skipped = report.skipped.len(),
                    "Propagation finished"
                );
            }
            _ => debug!(run_id = %run_id, %result, "Result does not trigger propagation"),
        }

        self.publish_deregistered(&run_id, DeregistrationCause::Completed);
    }

    /// Host hook: the build record is being discarded. Safe to call any
    /// number of times, in any state.
    pub fn notify_run_finalized(&self, run_id: &RunId) {
        if !self.is_initialized() {
            return;
        }
        self.deregister(run_id, DeregistrationCause::Finalized);
    }

    fn ensure_running(&self) -> Result<(), HierarchyError> {
        match *self.state.read() {
            ServiceState::Running => Ok(()),
            ServiceState::Uninitialized => Err(HierarchyError::NotInitialized),
            ServiceState::Stopped => Err(HierarchyError::Stopped),
        }
    }

    fn resolve_env(&self, run: &dyn Run, listener: &dyn TaskListener) -> EnvVars {
        match run.environment(listener) {
            Ok(env) => env,
            Err(e) => {
                error!(run_id = %run.id(), "Failed to resolve environment: {}", e);
                self.console
                    .error(listener, &format!("Could not resolve environment: {}", e));
                EnvVars::new()
            }
        }
    }

    fn deregister(&self, run_id: &RunId, cause: DeregistrationCause) {
        if self.registry.unregister(run_id).is_some() {
            self.publish_deregistered(run_id, cause);
        }
    }

    fn publish_deregistered(&self, run_id: &RunId, cause: DeregistrationCause) {
        debug!(run_id = %run_id, ?cause, "Run deregistered");
        self.event_bus.publish(HierarchyEvent::RunDeregistered {
            run_id: run_id.clone(),
            cause,
            deregistered_at: Utc::now(),
        });
    }
}
