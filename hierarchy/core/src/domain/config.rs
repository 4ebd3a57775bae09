// Copyright (c) 2026 Hierarchy Killer contributors
// SPDX-License-Identifier: MIT

// Engine Configuration Types
//
// Kubernetes-style manifest (apiVersion/kind/metadata/spec) for the engine
// itself. Per-build policy is NOT configured here; it comes from each
// build's environment (see domain::policy).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const API_VERSION: &str = "hierarchy-killer/v1";
pub const KIND: &str = "KillerConfig";
pub const CONFIG_PATH_ENV: &str = "HIERARCHY_KILLER_CONFIG_PATH";
pub const VERBOSITY_ENV: &str = "HIERARCHY_KILLER_VERBOSITY";

/// Top-level engine configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KillerConfigManifest {
    /// API version (must be "hierarchy-killer/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "KillerConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    #[serde(default)]
    pub spec: KillerConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Human-readable instance name
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KillerConfigSpec {
    /// How lines are written to build consoles
    #[serde(default)]
    pub listener: ListenerConfig,

    /// Environment variable holding the server's base URL, prepended to
    /// build URLs in abort reasons and console notices
    #[serde(default = "default_server_url_variable")]
    pub server_url_variable: String,

    #[serde(default)]
    pub event_bus: EventBusConfig,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observability: Option<ObservabilityConfig>,
}

/// Severity of a line written to a build console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListenerLevel {
    Error,
    Warning,
    Info,
    Debug,
}

impl std::str::FromStr for ListenerLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(ListenerLevel::Error),
            "warning" | "warn" => Ok(ListenerLevel::Warning),
            "info" => Ok(ListenerLevel::Info),
            "debug" => Ok(ListenerLevel::Debug),
            other => Err(format!("unknown listener level '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenerConfig {
    /// Most verbose level still written to build consoles
    #[serde(default = "default_verbosity")]
    pub verbosity: ListenerLevel,

    /// Prefix of every console line
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            verbosity: default_verbosity(),
            prefix: default_prefix(),
        }
    }
}

impl ListenerConfig {
    pub fn enabled(&self, level: ListenerLevel) -> bool {
        level <= self.verbosity
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventBusConfig {
    /// Events buffered per subscriber before the oldest are dropped
    #[serde(default = "default_event_capacity")]
    pub capacity: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            capacity: default_event_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("json" or "text")
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

fn default_verbosity() -> ListenerLevel {
    ListenerLevel::Info
}

fn default_prefix() -> String {
    "HierarchyKiller: ".to_string()
}

fn default_server_url_variable() -> String {
    "JENKINS_URL".to_string()
}

fn default_event_capacity() -> usize {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for KillerConfigSpec {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            server_url_variable: default_server_url_variable(),
            event_bus: EventBusConfig::default(),
            observability: None,
        }
    }
}

impl Default for KillerConfigManifest {
    fn default() -> Self {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "hierarchy-killer".to_string());

        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: hostname,
                labels: None,
            },
            spec: KillerConfigSpec::default(),
        }
    }
}

impl KillerConfigManifest {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Candidate configuration paths, in precedence order
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            paths.push(PathBuf::from(path));
        }
        paths.push(PathBuf::from("./hierarchy-killer.yaml"));
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".hierarchy-killer").join("config.yaml"));
        }
        #[cfg(unix)]
        paths.push(PathBuf::from("/etc/hierarchy-killer/config.yaml"));
        #[cfg(windows)]
        paths.push(PathBuf::from("C:\\ProgramData\\HierarchyKiller\\config.yaml"));
        paths
    }

    /// First existing path from [`Self::search_paths`]
    pub fn discover_config() -> Option<PathBuf> {
        Self::search_paths().into_iter().find(|p| p.exists())
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // An explicit path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::debug!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(VERBOSITY_ENV) {
            match val.parse::<ListenerLevel>() {
                Ok(level) => {
                    tracing::info!("Environment override: {}={:?}", VERBOSITY_ENV, level);
                    self.spec.listener.verbosity = level;
                }
                Err(e) => {
                    tracing::warn!("Invalid value for {}: {}. Ignoring.", VERBOSITY_ENV, e);
                }
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        if self.spec.server_url_variable.is_empty() {
            anyhow::bail!("spec.server_url_variable cannot be empty");
        }

        if self.spec.event_bus.capacity == 0 {
            anyhow::bail!("spec.event_bus.capacity must be greater than zero");
        }

        if let Some(logging) = self.spec.observability.as_ref().and_then(|o| o.logging.as_ref()) {
            if logging.format != "json" && logging.format != "text" {
                anyhow::bail!(
                    "Invalid observability.logging.format: '{}'. Expected 'json' or 'text'",
                    logging.format
                );
            }
        }

        Ok(())
    }

    pub fn metrics_enabled(&self) -> bool {
        self.spec
            .observability
            .as_ref()
            .and_then(|o| o.metrics.as_ref())
            .map(|m| m.enabled)
            .unwrap_or(true)
    }

    /// Configured `observability.logging`, if any
    pub fn logging(&self) -> Option<&LoggingConfig> {
        self.spec.observability.as_ref().and_then(|o| o.logging.as_ref())
    }

    pub fn json_logging(&self) -> bool {
        self.logging().map(|l| l.format == "json").unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_manifest() {
        let manifest = KillerConfigManifest::default();
        assert_eq!(manifest.api_version, API_VERSION);
        assert_eq!(manifest.kind, KIND);
        assert!(!manifest.metadata.name.is_empty());
        assert_eq!(manifest.spec.listener.verbosity, ListenerLevel::Info);
        assert_eq!(manifest.spec.server_url_variable, "JENKINS_URL");
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_minimal_yaml_fills_defaults() {
        let yaml = r#"
apiVersion: "hierarchy-killer/v1"
kind: KillerConfig
metadata:
  name: "ci-primary"
spec:
  listener:
    verbosity: debug
"#;
        let manifest = KillerConfigManifest::from_yaml_str(yaml).unwrap();
        assert_eq!(manifest.metadata.name, "ci-primary");
        assert_eq!(manifest.spec.listener.verbosity, ListenerLevel::Debug);
        assert_eq!(manifest.spec.listener.prefix, "HierarchyKiller: ");
        assert_eq!(manifest.spec.event_bus.capacity, 1000);
        assert!(manifest.metrics_enabled());
    }

    #[test]
    fn test_listener_level_gate() {
        let listener = ListenerConfig::default();
        assert!(listener.enabled(ListenerLevel::Error));
        assert!(listener.enabled(ListenerLevel::Info));
        assert!(!listener.enabled(ListenerLevel::Debug));
    }

    #[test]
    fn test_validation() {
        let mut manifest = KillerConfigManifest::default();

        manifest.api_version = "wrong/v1".to_string();
        assert!(manifest.validate().is_err());
        manifest.api_version = API_VERSION.to_string();

        manifest.kind = "NodeConfig".to_string();
        assert!(manifest.validate().is_err());
        manifest.kind = KIND.to_string();

        manifest.spec.server_url_variable = String::new();
        assert!(manifest.validate().is_err());
        manifest.spec.server_url_variable = "CI_URL".to_string();

        manifest.spec.event_bus.capacity = 0;
        assert!(manifest.validate().is_err());
        manifest.spec.event_bus.capacity = 16;

        manifest.spec.observability = Some(ObservabilityConfig {
            logging: Some(LoggingConfig {
                level: "info".to_string(),
                format: "xml".to_string(),
            }),
            metrics: Some(MetricsConfig { enabled: false }),
        });
        assert!(manifest.validate().is_err());
        assert!(!manifest.metrics_enabled());
    }

    #[test]
    fn test_yaml_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hierarchy-killer.yaml");

        let mut manifest = KillerConfigManifest::default();
        manifest.metadata.name = "ci-secondary".to_string();
        manifest.spec.listener.verbosity = ListenerLevel::Warning;
        manifest.to_yaml_file(&path).unwrap();

        let loaded = KillerConfigManifest::load_or_default(Some(path)).unwrap();
        assert_eq!(loaded.metadata.name, "ci-secondary");
        assert_eq!(loaded.spec.listener.verbosity, ListenerLevel::Warning);
    }

    #[test]
    fn test_explicit_missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = KillerConfigManifest::load_or_default(Some(dir.path().join("absent.yaml")));
        assert!(result.is_err());
    }
}
