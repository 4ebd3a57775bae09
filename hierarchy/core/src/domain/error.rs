// Copyright (c) 2026 Hierarchy Killer contributors
// SPDX-License-Identifier: MIT

use thiserror::Error;

use crate::domain::run::RunId;

/// Failures reported by the host CI server.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Environment resolution failed: {0}")]
    Environment(String),

    #[error("Unknown run: {0}")]
    UnknownRun(RunId),
}

/// Engine-side conditions. None of these is ever surfaced to the host; the
/// lifecycle service logs them and carries on.
#[derive(Debug, Error)]
pub enum HierarchyError {
    #[error("Engine not yet initialized")]
    NotInitialized,

    #[error("Engine has been shut down")]
    Stopped,

    #[error("Run {run} is in the downstream list of {parent} and still active, but has no registry data")]
    MissingDownstreamData { run: RunId, parent: RunId },

    #[error("Invalid run result: {0}")]
    InvalidResult(String),
}
