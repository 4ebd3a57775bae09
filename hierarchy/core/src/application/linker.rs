// Copyright (c) 2026 Hierarchy Killer contributors
// SPDX-License-Identifier: MIT
//! # Hierarchy Linker
//!
//! Runs once per governed build, at start. Registers the build and, if one
//! of its upstream causes names a build that is still tracked, links the two:
//! the parent gains the child in its downstream list and the child records
//! the parent as its upstream.
//!
//! Causes are scanned from last to first and the first tracked parent wins,
//! which keeps the single-parent model: a child is never listed under more
//! than one parent, and its upstream always names the parent that lists it.
//! A build with no tracked parent is the root of its own fragment.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::application::console::Console;
use crate::domain::events::HierarchyEvent;
use crate::domain::run::{EnvVars, Run, RunId, TaskListener};
use crate::domain::run_data::{DownstreamLink, RunData};
use crate::infrastructure::event_bus::EventBus;
use crate::infrastructure::registry::RunRegistry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    /// Registered with no tracked upstream.
    Root,
    /// Registered and linked under `upstream`.
    Linked { upstream: RunId },
    /// The build was already registered; nothing changed.
    AlreadyTracked,
}

pub struct HierarchyLinker {
    registry: Arc<RunRegistry>,
    event_bus: EventBus,
    console: Console,
}

impl HierarchyLinker {
    pub fn new(registry: Arc<RunRegistry>, event_bus: EventBus, console: Console) -> Self {
        Self {
            registry,
            event_bus,
            console,
        }
    }

    /// Register `run` and link it under its tracked upstream, if any.
    /// `env` is the child's resolved environment.
    pub fn link(&self, run: Arc<dyn Run>, listener: Arc<dyn TaskListener>, env: &EnvVars) -> LinkOutcome {
        let run_id = run.id();

        if !self.registry.register(RunData::new(run.clone(), listener)) {
            debug!(run_id = %run_id, "Start notification for a run that is already tracked");
            return LinkOutcome::AlreadyTracked;
        }
        self.event_bus.publish(HierarchyEvent::RunRegistered {
            run_id: run_id.clone(),
            registered_at: Utc::now(),
        });

        let causes = run.causes();
        let candidates = causes.iter().rev().filter_map(|cause| cause.upstream_run());
        let link = DownstreamLink::new(run_id.clone(), &run);

        for parent_id in candidates {
            let parent_listener = self.registry.with_data_mut(parent_id, |parent| {
                parent.add_downstream(link.clone());
                parent.listener().clone()
            });

            let Some(parent_listener) = parent_listener else {
                debug!(run_id = %run_id, upstream = %parent_id, "Upstream run is not tracked");
                continue;
            };

            self.registry
                .with_data_mut(&run_id, |data| data.link_upstream(parent_id.clone()));

            let child_url = self.console.absolute_url(env, run.as_ref());
            self.console
                .info(parent_listener.as_ref(), &format!("Triggered: {}", child_url));
            info!(run_id = %run_id, upstream = %parent_id, "Linked run under tracked upstream");
            self.event_bus.publish(HierarchyEvent::RunLinked {
                run_id: run_id.clone(),
                upstream: parent_id.clone(),
                linked_at: Utc::now(),
            });

            return LinkOutcome::Linked {
                upstream: parent_id.clone(),
            };
        }

        LinkOutcome::Root
    }
}
