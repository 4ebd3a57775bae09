// Copyright (c) 2026 Hierarchy Killer contributors
// SPDX-License-Identifier: MIT
//! # Host Run Model
//!
//! The engine never owns builds. Everything it knows about a build comes
//! through the collaborator traits defined here, implemented by the host CI
//! server (or by [`crate::infrastructure::simulation`] in tests and the CLI).
//!
//! | Type | Role |
//! |------|------|
//! | [`RunId`] | Stable identity of a build execution |
//! | [`RunResult`] | Ordered terminal result (`Success` is best) |
//! | [`Cause`] | One causing event of a build |
//! | [`Run`] | Host handle to a build execution |
//! | [`TaskListener`] | Per-build console output sink |
//! | [`EnvVars`] | Resolved build environment |

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::domain::error::{HierarchyError, HostError};

/// Stable identity of a build execution, as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RunId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Terminal result of a build, ordered from best to worst.
///
/// The derived ordering is the severity order: a result is worse than
/// another iff it compares greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunResult {
    Success,
    Unstable,
    Failure,
    NotBuilt,
    Aborted,
}

impl RunResult {
    pub fn is_worse_than(self, other: RunResult) -> bool {
        self > other
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunResult::Success => "SUCCESS",
            RunResult::Unstable => "UNSTABLE",
            RunResult::Failure => "FAILURE",
            RunResult::NotBuilt => "NOT_BUILT",
            RunResult::Aborted => "ABORTED",
        }
    }
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunResult {
    type Err = HierarchyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUCCESS" => Ok(RunResult::Success),
            "UNSTABLE" => Ok(RunResult::Unstable),
            "FAILURE" => Ok(RunResult::Failure),
            "NOT_BUILT" => Ok(RunResult::NotBuilt),
            "ABORTED" => Ok(RunResult::Aborted),
            other => Err(HierarchyError::InvalidResult(other.to_string())),
        }
    }
}

/// One causing event of a build.
///
/// Only [`Cause::Upstream`] references another build; the remaining
/// variants exist so hosts can report their full causal chain verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Cause {
    Upstream { run: RunId },
    User { name: String },
    Timer,
    Remote { address: String },
    Other { description: String },
}

impl Cause {
    pub fn upstream_run(&self) -> Option<&RunId> {
        match self {
            Cause::Upstream { run } => Some(run),
            _ => None,
        }
    }
}

/// Per-build console output sink owned by the host.
pub trait TaskListener: Send + Sync {
    fn log(&self, line: &str);
}

/// Resolved build environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvVars(HashMap<String, String>);

impl EnvVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Value of `key`, or `default` when the variable is not set.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<HashMap<String, String>> for EnvVars {
    fn from(map: HashMap<String, String>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvVars {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Host handle to a single build execution.
///
/// Implementations must be cheap to query; the engine calls these methods
/// from inside lifecycle notifications.
pub trait Run: Send + Sync {
    fn id(&self) -> RunId;

    /// URL of the build relative to the server root (e.g. `job/deploy/42/`).
    fn url(&self) -> String;

    /// Whether the build is still executing.
    fn is_active(&self) -> bool;

    fn result(&self) -> Option<RunResult>;

    fn set_result(&self, result: RunResult);

    /// Ask the executor running this build to stop with `result`.
    /// Fire-and-forget: the engine does not wait for the build to stop.
    fn interrupt(&self, result: RunResult);

    fn causes(&self) -> Vec<Cause>;

    fn environment(&self, listener: &dyn TaskListener) -> Result<EnvVars, HostError>;
}
