// Copyright (c) 2026 Hierarchy Killer contributors
// SPDX-License-Identifier: MIT

// Metric names and the diagnostic abort counter.
//
// Metrics go through the `metrics` facade; without an installed recorder the
// macros are no-ops. `observability.metrics.enabled: false` turns emission off
// even when a recorder is installed.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

pub const ABORTS_TOTAL: &str = "hierarchy_killer_aborts_total";
pub const RUNS_REGISTERED_TOTAL: &str = "hierarchy_killer_runs_registered_total";
pub const REGISTRY_SIZE: &str = "hierarchy_killer_registry_size";

/// Whether engine metrics reach the installed recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Telemetry {
    enabled: bool,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Telemetry {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn record_registration(&self) {
        if self.enabled {
            metrics::counter!(RUNS_REGISTERED_TOTAL).increment(1);
        }
    }

    pub(crate) fn record_registry_size(&self, size: usize) {
        if self.enabled {
            metrics::gauge!(REGISTRY_SIZE).set(size as f64);
        }
    }

    fn record_abort(&self) {
        if self.enabled {
            metrics::counter!(ABORTS_TOTAL).increment(1);
        }
    }
}

/// Number of builds aborted by propagation since the engine started. The
/// count is kept whether or not metrics are enabled.
#[derive(Debug, Default)]
pub struct AbortCounter {
    hits: AtomicU64,
    telemetry: Telemetry,
}

impl AbortCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_telemetry(telemetry: Telemetry) -> Self {
        Self {
            hits: AtomicU64::new(0),
            telemetry,
        }
    }

    /// Count one abort and return the new total.
    pub fn increment(&self) -> u64 {
        self.telemetry.record_abort();
        self.hits.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn get(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    pub aborts: u64,
    pub tracked_runs: usize,
}
