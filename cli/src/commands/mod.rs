// Copyright (c) 2026 Hierarchy Killer contributors
// SPDX-License-Identifier: MIT

//! Command implementations for the hkiller CLI

pub mod config;
pub mod simulate;

pub use self::config::ConfigCommand;
pub use self::simulate::SimulateCommand;
