// Copyright (c) 2026 Hierarchy Killer contributors
// SPDX-License-Identifier: MIT
//! # `hierarchy-killer-core`
//!
//! Tracks upstream/downstream relationships among concurrently executing CI
//! builds and aborts related builds when one member of a hierarchy fails,
//! subject to opt-in flags in each build's environment.
//!
//! ## Crate Layout
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | Run model, policy evaluator, events, configuration |
//! | [`application`] | Application | Hierarchy linker, kill propagator, lifecycle service |
//! | [`infrastructure`] | Infrastructure | Run registry, event bus, telemetry, simulated host |
//!
//! ## Data Flow
//!
//! `notify_run_started` → linker registers the build and links it under a
//! tracked upstream → `notify_run_completed` → policy decides → propagator
//! aborts relatives → `notify_run_finalized` discards the registry entry.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::lifecycle::HierarchyKillerService;
pub use domain::*;
