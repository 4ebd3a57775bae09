// Copyright (c) 2026 Hierarchy Killer contributors
// SPDX-License-Identifier: MIT
//! # Application Layer
//!
//! Use cases driven by the host's lifecycle notifications.
//!
//! | Module | Role |
//! |--------|------|
//! | [`lifecycle`] | `HierarchyKillerService`, the three host hooks |
//! | [`linker`] | Registers a starting build and links it to a tracked parent |
//! | [`propagator`] | Aborts relatives of a failed build |
//! | [`console`] | Prefixed, level-gated writes to build consoles |

pub mod console;
pub mod lifecycle;
pub mod linker;
pub mod propagator;
