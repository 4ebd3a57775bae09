// Copyright (c) 2026 Hierarchy Killer contributors
// SPDX-License-Identifier: MIT
//! # Infrastructure Layer
//!
//! | Module | Role |
//! |--------|------|
//! | [`registry`] | Concurrent run registry |
//! | [`event_bus`] | Broadcast of `HierarchyEvent`s |
//! | [`telemetry`] | Abort counter and metric names |
//! | [`simulation`] | In-memory host for tests and replays |

pub mod event_bus;
pub mod registry;
pub mod simulation;
pub mod telemetry;
