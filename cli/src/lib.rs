// Copyright (c) 2026 Hierarchy Killer contributors
// SPDX-License-Identifier: MIT
//! Hierarchy killer CLI library - exposes testable components
//!
//! # Architecture
//!
//! - **Layer:** Interface / Presentation Layer
//! - **Purpose:** Operator commands and the scenario format replayed by
//!   `hkiller simulate`

pub mod commands;
pub mod logging;
pub mod scenario;
