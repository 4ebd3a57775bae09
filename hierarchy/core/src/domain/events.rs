// Copyright (c) 2026 Hierarchy Killer contributors
// SPDX-License-Identifier: MIT

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::run::{RunId, RunResult};

/// Why a registry entry went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeregistrationCause {
    Completed,
    NotGoverned,
    NoResult,
    Finalized,
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HierarchyEvent {
    RunRegistered {
        run_id: RunId,
        registered_at: DateTime<Utc>,
    },
    RunLinked {
        run_id: RunId,
        upstream: RunId,
        linked_at: DateTime<Utc>,
    },
    PropagationTriggered {
        run_id: RunId,
        result: RunResult,
        upstream: bool,
        downstream: bool,
        triggered_at: DateTime<Utc>,
    },
    RunAborted {
        run_id: RunId,
        trigger: RunId,
        reason: String,
        aborted_at: DateTime<Utc>,
    },
    RunDeregistered {
        run_id: RunId,
        cause: DeregistrationCause,
        deregistered_at: DateTime<Utc>,
    },
}

impl HierarchyEvent {
    pub fn run_id(&self) -> &RunId {
        match self {
            HierarchyEvent::RunRegistered { run_id, .. }
            | HierarchyEvent::RunLinked { run_id, .. }
            | HierarchyEvent::PropagationTriggered { run_id, .. }
            | HierarchyEvent::RunAborted { run_id, .. }
            | HierarchyEvent::RunDeregistered { run_id, .. } => run_id,
        }
    }
}
