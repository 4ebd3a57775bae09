// Copyright (c) 2026 Hierarchy Killer contributors
// SPDX-License-Identifier: MIT
//! # Domain Layer
//!
//! Pure types for hierarchy tracking. No I/O, no registry access.
//!
//! | Module | Key Types |
//! |--------|-----------|
//! | [`run`] | `RunId`, `RunResult`, `Cause`, `Run`, `TaskListener`, `EnvVars` |
//! | [`run_data`] | `RunData`, `RunSnapshot` |
//! | [`policy`] | `KillPolicy`, `Propagation`, flag evaluators |
//! | [`events`] | `HierarchyEvent` |
//! | [`config`] | `KillerConfigManifest` |
//! | [`error`] | `HierarchyError`, `HostError` |

pub mod config;
pub mod error;
pub mod events;
pub mod policy;
pub mod run;
pub mod run_data;
