// Copyright (c) 2026 Hierarchy Killer contributors
// SPDX-License-Identifier: MIT

//! Log setup for the `hkiller` binary.

use hierarchy_killer_core::domain::config::KillerConfigManifest;

const DEFAULT_LEVEL: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: String,
    pub json: bool,
}

impl LogSettings {
    /// `--log-level` (or `$HIERARCHY_KILLER_LOG_LEVEL`) wins over
    /// `observability.logging.level`, which wins over `info`. The output
    /// format only comes from the config file.
    pub fn resolve(flag: Option<&str>, config: Option<&KillerConfigManifest>) -> Self {
        let configured = config.and_then(|c| c.logging()).map(|l| l.level.as_str());
        let level = flag.or(configured).unwrap_or(DEFAULT_LEVEL).to_string();
        let json = config.map(|c| c.json_logging()).unwrap_or(false);
        Self { level, json }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(level: &str, format: &str) -> KillerConfigManifest {
        let yaml = format!(
            r#"
apiVersion: hierarchy-killer/v1
kind: KillerConfig
metadata:
  name: test
spec:
  observability:
    logging:
      level: {level}
      format: {format}
"#
        );
        KillerConfigManifest::from_yaml_str(&yaml).unwrap()
    }

    #[test]
    fn test_config_level_applies_without_flag() {
        let config = config("debug", "json");
        let settings = LogSettings::resolve(None, Some(&config));
        assert_eq!(settings.level, "debug");
        assert!(settings.json);
    }

    #[test]
    fn test_flag_overrides_config_level() {
        let config = config("debug", "text");
        let settings = LogSettings::resolve(Some("warn"), Some(&config));
        assert_eq!(settings.level, "warn");
        assert!(!settings.json);
    }

    #[test]
    fn test_defaults_without_config() {
        assert_eq!(
            LogSettings::resolve(None, None),
            LogSettings {
                level: "info".to_string(),
                json: false,
            }
        );
        let bare = KillerConfigManifest::default();
        assert_eq!(LogSettings::resolve(None, Some(&bare)).level, "info");
    }
}
