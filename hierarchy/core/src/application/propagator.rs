// Copyright (c) 2026 Hierarchy Killer contributors
// SPDX-License-Identifier: MIT
//! # Kill Propagator
//!
//! Runs when a governed build (the trigger) completes with a result bad
//! enough to trigger its policy. Aborts the trigger's immediate upstream
//! and/or every still-active build in its downstream list, in insertion order.
//!
//! Propagation goes exactly one hop. Grandparents and grandchildren are
//! reached only if the host delivers a completion for each aborted build,
//! which then propagates under that build's own policy.
//!
//! Abort reasons chain: a victim's reason is `", caused by <trigger url>"`
//! followed by the trigger's own reason, if the trigger was itself a victim.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info};

use crate::application::console::Console;
use crate::domain::error::HierarchyError;
use crate::domain::events::HierarchyEvent;
use crate::domain::policy::Propagation;
use crate::domain::run::{EnvVars, Run, RunId, RunResult, TaskListener};
use crate::domain::run_data::RunData;
use crate::infrastructure::event_bus::EventBus;
use crate::infrastructure::registry::RunRegistry;
use crate::infrastructure::telemetry::AbortCounter;

/// What one propagation pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropagationReport {
    pub reason: String,
    pub aborted: Vec<RunId>,
    pub skipped: Vec<RunId>,
}

pub struct KillPropagator {
    registry: Arc<RunRegistry>,
    event_bus: EventBus,
    aborts: Arc<AbortCounter>,
    console: Console,
}

impl KillPropagator {
    pub fn new(
        registry: Arc<RunRegistry>,
        event_bus: EventBus,
        aborts: Arc<AbortCounter>,
        console: Console,
    ) -> Self {
        Self {
            registry,
            event_bus,
            aborts,
            console,
        }
    }

    /// Abort the relatives of `trigger` selected by `directions`.
    ///
    /// `trigger_data` is the trigger's entry, already taken out of the
    /// registry so that no build can link under the trigger once its
    /// downstream list has been read. Problems with individual relatives are
    /// logged and skipped.
    pub fn propagate(
        &self,
        trigger: &dyn Run,
        trigger_data: &RunData,
        listener: &dyn TaskListener,
        env: &EnvVars,
        directions: Propagation,
    ) -> PropagationReport {
        let trigger_id = trigger.id();
        let reason = format!(
            ", caused by {}{}",
            self.console.absolute_url(env, trigger),
            trigger_data.reason()
        );
        let mut report = PropagationReport {
            reason: reason.clone(),
            ..Default::default()
        };

        if directions.upstream {
            match trigger_data
                .upstream()
                .and_then(|id| self.active_tracked_run(id))
            {
                Some(parent) => self.abort(&parent, &trigger_id, &reason, listener, &mut report),
                None => self.console.debug(listener, "No running upstream build to abort"),
            }
        }

        if directions.downstream {
            for link in trigger_data.downstream() {
                let Some(child) = link.run.upgrade() else {
                    debug!(run_id = %link.id, "Downstream run released by host, skipping");
                    report.skipped.push(link.id.clone());
                    continue;
                };
                if !child.is_active() {
                    report.skipped.push(link.id.clone());
                    continue;
                }
                if !self.registry.contains(&link.id) {
                    let violation = HierarchyError::MissingDownstreamData {
                        run: link.id.clone(),
                        parent: trigger_id.clone(),
                    };
                    error!("{}", violation);
                    report.skipped.push(link.id.clone());
                    continue;
                }
                self.abort(&child, &trigger_id, &reason, listener, &mut report);
            }
        }

        report
    }

    /// Upstream handle, if the upstream is still tracked and still active.
    fn active_tracked_run(&self, id: &RunId) -> Option<Arc<dyn Run>> {
        let run = self.registry.with_data(id, |data| data.run().clone())?;
        run.is_active().then_some(run)
    }

    fn abort(
        &self,
        victim: &Arc<dyn Run>,
        trigger_id: &RunId,
        reason: &str,
        trigger_listener: &dyn TaskListener,
        report: &mut PropagationReport,
    ) {
        let victim_id = victim.id();
        let recorded = self.registry.with_data_mut(&victim_id, |data| {
            (data.record_abort(reason), data.listener().clone())
        });

        let victim_listener = match recorded {
            Some((true, victim_listener)) => victim_listener,
            Some((false, _)) => {
                debug!(run_id = %victim_id, "Run already aborted by another trigger");
                report.skipped.push(victim_id);
                return;
            }
            None => {
                debug!(run_id = %victim_id, "Run left the registry before it could be aborted");
                report.skipped.push(victim_id);
                return;
            }
        };

        victim.set_result(RunResult::Aborted);
        victim.interrupt(RunResult::Aborted);
        let total = self.aborts.increment();

        info!(run_id = %victim_id, trigger = %trigger_id, total, "Aborted {}{}", victim.url(), reason);
        self.console
            .info(victim_listener.as_ref(), &format!("Aborting{}", reason));
        self.console
            .info(trigger_listener, &format!("Aborted {}", victim.url()));
        self.event_bus.publish(HierarchyEvent::RunAborted {
            run_id: victim_id.clone(),
            trigger: trigger_id.clone(),
            reason: reason.to_string(),
            aborted_at: Utc::now(),
        });
        report.aborted.push(victim_id);
    }
}
