// Copyright (c) 2026 Hierarchy Killer contributors
// SPDX-License-Identifier: MIT

use crate::domain::config::{ListenerConfig, ListenerLevel};
use crate::domain::run::{EnvVars, Run, TaskListener};

/// Writes engine messages to build consoles and renders build URLs.
#[derive(Debug, Clone)]
pub struct Console {
    listener: ListenerConfig,
    server_url_variable: String,
}

impl Console {
    pub fn new(listener: ListenerConfig, server_url_variable: impl Into<String>) -> Self {
        Self {
            listener,
            server_url_variable: server_url_variable.into(),
        }
    }

    pub fn log(&self, target: &dyn TaskListener, level: ListenerLevel, message: &str) {
        if self.listener.enabled(level) {
            target.log(&format!("{}{}", self.listener.prefix, message));
        }
    }

    pub fn error(&self, target: &dyn TaskListener, message: &str) {
        self.log(target, ListenerLevel::Error, message);
    }

    pub fn info(&self, target: &dyn TaskListener, message: &str) {
        self.log(target, ListenerLevel::Info, message);
    }

    pub fn debug(&self, target: &dyn TaskListener, message: &str) {
        self.log(target, ListenerLevel::Debug, message);
    }

    /// `run`'s URL prefixed with the server base URL from `env` (empty when
    /// the variable is not set).
    pub fn absolute_url(&self, env: &EnvVars, run: &dyn Run) -> String {
        format!("{}{}", env.get_or(&self.server_url_variable, ""), run.url())
    }
}
