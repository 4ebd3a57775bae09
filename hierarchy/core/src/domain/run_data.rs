// Copyright (c) 2026 Hierarchy Killer contributors
// SPDX-License-Identifier: MIT
//! # Tracked Hierarchy State
//!
//! One [`RunData`] exists per governed run that has not been finalized. It is
//! owned by the [`RunRegistry`](crate::infrastructure::registry::RunRegistry).
//!
//! # Invariants
//!
//! - `upstream` is set only while linking the run at start time.
//! - `downstream` is append-only and holds no duplicates; every entry's own
//!   `upstream` points back at this run.
//! - `reason` is empty until the run is aborted by propagation, then set once.

use std::fmt;
use std::sync::{Arc, Weak};

use crate::domain::run::{Run, RunId, TaskListener};

/// Downstream entry: the child's id plus a non-owning handle to the host's
/// run, so the propagator can ask whether the child is still active even
/// after its registry entry is gone.
#[derive(Clone)]
pub struct DownstreamLink {
    pub id: RunId,
    pub run: Weak<dyn Run>,
}

impl DownstreamLink {
    /// `id` is taken from the caller so that building a link never calls
    /// into the host.
    pub fn new(id: RunId, run: &Arc<dyn Run>) -> Self {
        Self {
            id,
            run: Arc::downgrade(run),
        }
    }
}

impl fmt::Debug for DownstreamLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DownstreamLink").field(&self.id).finish()
    }
}

pub struct RunData {
    run: Arc<dyn Run>,
    listener: Arc<dyn TaskListener>,
    upstream: Option<RunId>,
    downstream: Vec<DownstreamLink>,
    reason: String,
}

impl RunData {
    pub fn new(run: Arc<dyn Run>, listener: Arc<dyn TaskListener>) -> Self {
        Self {
            run,
            listener,
            upstream: None,
            downstream: Vec::new(),
            reason: String::new(),
        }
    }

    pub fn run(&self) -> &Arc<dyn Run> {
        &self.run
    }

    pub fn listener(&self) -> &Arc<dyn TaskListener> {
        &self.listener
    }

    pub fn upstream(&self) -> Option<&RunId> {
        self.upstream.as_ref()
    }

    pub fn downstream(&self) -> &[DownstreamLink] {
        &self.downstream
    }

    pub fn downstream_ids(&self) -> Vec<RunId> {
        self.downstream.iter().map(|link| link.id.clone()).collect()
    }

    /// Abort reason chain; empty unless this run was aborted by propagation.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn was_aborted(&self) -> bool {
        !self.reason.is_empty()
    }

    pub(crate) fn link_upstream(&mut self, parent: RunId) {
        self.upstream = Some(parent);
    }

    /// Returns `false` if a child with the same id was already linked.
    pub(crate) fn add_downstream(&mut self, child: DownstreamLink) -> bool {
        if self.downstream.iter().any(|link| link.id == child.id) {
            return false;
        }
        self.downstream.push(child);
        true
    }

    /// Returns `false` if a reason was already recorded.
    pub(crate) fn record_abort(&mut self, reason: &str) -> bool {
        if self.was_aborted() {
            return false;
        }
        self.reason = reason.to_string();
        true
    }
}

impl fmt::Debug for RunData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunData")
            .field("run", &self.run.id())
            .field("upstream", &self.upstream)
            .field("downstream", &self.downstream)
            .field("reason", &self.reason)
            .finish()
    }
}

/// Point-in-time copy of a registry entry, detached from the registry lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSnapshot {
    pub id: RunId,
    pub upstream: Option<RunId>,
    pub downstream: Vec<RunId>,
    pub reason: String,
}

impl From<&RunData> for RunSnapshot {
    fn from(data: &RunData) -> Self {
        Self {
            id: data.run.id(),
            upstream: data.upstream.clone(),
            downstream: data.downstream_ids(),
            reason: data.reason.clone(),
        }
    }
}
