// Copyright (c) 2026 Hierarchy Killer contributors
// SPDX-License-Identifier: MIT
//! # Kill Policy Evaluator
//!
//! Pure decision logic over a build's resolved environment. Every flag is a
//! string that must equal `"true"` exactly; anything else, including an
//! absent variable, reads as `false`.
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `ENABLE_HIERARCHY_KILLER` | Build is governed by the engine |
//! | `HIERARCHY_KILLER_KILL_UNSTABLE` | Trigger on `UNSTABLE` or worse instead of `FAILURE` or worse |
//! | `HIERARCHY_KILLER_KILL_UPSTREAM` | Abort the immediate upstream build |
//! | `HIERARCHY_KILLER_KILL_DOWNSTREAM` | Abort every tracked downstream build |

use serde::{Deserialize, Serialize};

use crate::domain::run::{EnvVars, RunResult};

pub const ENABLE_HIERARCHY_KILLER: &str = "ENABLE_HIERARCHY_KILLER";
pub const KILL_UNSTABLE: &str = "HIERARCHY_KILLER_KILL_UNSTABLE";
pub const KILL_UPSTREAM: &str = "HIERARCHY_KILLER_KILL_UPSTREAM";
pub const KILL_DOWNSTREAM: &str = "HIERARCHY_KILLER_KILL_DOWNSTREAM";

fn flag(env: &EnvVars, key: &str) -> bool {
    env.get_or(key, "false") == "true"
}

pub fn is_governed(env: &EnvVars) -> bool {
    flag(env, ENABLE_HIERARCHY_KILLER)
}

/// Whether a build that ended with `result` should start propagation.
/// A missing result never triggers.
pub fn should_kill(env: &EnvVars, result: Option<RunResult>) -> bool {
    exceeds_threshold(flag(env, KILL_UNSTABLE), result)
}

fn exceeds_threshold(kill_unstable: bool, result: Option<RunResult>) -> bool {
    let Some(result) = result else {
        return false;
    };
    let threshold = if kill_unstable {
        RunResult::Success
    } else {
        RunResult::Unstable
    };
    result.is_worse_than(threshold)
}

pub fn kill_upstream(env: &EnvVars) -> bool {
    flag(env, KILL_UPSTREAM)
}

pub fn kill_downstream(env: &EnvVars) -> bool {
    flag(env, KILL_DOWNSTREAM)
}

/// All four flags of one build, read once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillPolicy {
    pub governed: bool,
    pub kill_unstable: bool,
    pub kill_upstream: bool,
    pub kill_downstream: bool,
}

impl KillPolicy {
    pub fn from_env(env: &EnvVars) -> Self {
        Self {
            governed: is_governed(env),
            kill_unstable: flag(env, KILL_UNSTABLE),
            kill_upstream: kill_upstream(env),
            kill_downstream: kill_downstream(env),
        }
    }

    /// Same threshold as [`should_kill`], over the flags already read.
    pub fn should_kill(&self, result: Option<RunResult>) -> bool {
        exceeds_threshold(self.kill_unstable, result)
    }

    /// Directions to propagate for a build that ended with `result`, or
    /// `None` when nothing should happen.
    pub fn decide(&self, result: Option<RunResult>) -> Option<Propagation> {
        if !self.governed || !self.should_kill(result) {
            return None;
        }
        Some(Propagation {
            upstream: self.kill_upstream,
            downstream: self.kill_downstream,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Propagation {
    pub upstream: bool,
    pub downstream: bool,
}

impl Propagation {
    pub fn is_noop(&self) -> bool {
        !self.upstream && !self.downstream
    }
}
