//! Engine configuration.
//!
//! Configuration is loaded from environment variables, falling back to the
//! defaults for anything unset or unparsable.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use credgate_rules::MAX_LEN;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Whether the engine intervenes in transition requests at all.
    pub enabled: bool,

    /// Log rejected rule text at warn level.
    pub log_parse_errors: bool,

    /// Rule text must be strictly shorter than this many bytes.
    pub max_rule_len: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_parse_errors: false,
            max_rule_len: MAX_LEN,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `CREDGATE_ENABLED`: Whether the engine is enabled (default: true)
    /// - `CREDGATE_LOG_PARSE_ERRORS`: Log rejected rule text (default: false)
    /// - `CREDGATE_MAX_RULE_LEN`: Rule text length limit in bytes (default: 1024)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();

        Self {
            enabled: lookup("CREDGATE_ENABLED")
                .and_then(|s| parse_flag(&s))
                .unwrap_or(default.enabled),
            log_parse_errors: lookup("CREDGATE_LOG_PARSE_ERRORS")
                .and_then(|s| parse_flag(&s))
                .unwrap_or(default.log_parse_errors),
            max_rule_len: lookup("CREDGATE_MAX_RULE_LEN")
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.max_rule_len),
        }
    }

    /// Check that the configured values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_rule_len == 0 || self.max_rule_len > MAX_LEN {
            return Err(ConfigError::InvalidValue {
                key: "CREDGATE_MAX_RULE_LEN".to_string(),
                message: format!("must be between 1 and {}, got {}", MAX_LEN, self.max_rule_len),
            });
        }
        Ok(())
    }
}

/// `true`/`1` or `false`/`0`, ignoring case and surrounding blanks.
fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert!(config.enabled);
        assert!(!config.log_parse_errors);
        assert_eq!(config.max_rule_len, MAX_LEN);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("CREDGATE_ENABLED", "0"),
            ("CREDGATE_LOG_PARSE_ERRORS", "true"),
            ("CREDGATE_MAX_RULE_LEN", "256"),
        ]));
        assert!(!config.enabled);
        assert!(config.log_parse_errors);
        assert_eq!(config.max_rule_len, 256);
    }

    #[test]
    fn test_from_lookup_falls_back_on_garbage() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("CREDGATE_ENABLED", "yes"),
            ("CREDGATE_LOG_PARSE_ERRORS", "maybe"),
            ("CREDGATE_MAX_RULE_LEN", "lots"),
        ]));
        assert!(config.enabled);
        assert!(!config.log_parse_errors);
        assert_eq!(config.max_rule_len, MAX_LEN);
    }

    #[test]
    fn test_flags_parse_alike() {
        for (value, expected) in [("FALSE", false), ("0", false), (" true ", true), ("1", true)] {
            let config = EngineConfig::from_lookup(lookup(&[
                ("CREDGATE_ENABLED", value),
                ("CREDGATE_LOG_PARSE_ERRORS", value),
            ]));
            assert_eq!(config.enabled, expected, "{:?}", value);
            assert_eq!(config.log_parse_errors, expected, "{:?}", value);
        }
    }

    #[test]
    fn test_unrecognized_flag_uses_default() {
        for value in ["off", "no", "False-ish", ""] {
            assert_eq!(parse_flag(value), None);
            let config = EngineConfig::from_lookup(lookup(&[
                ("CREDGATE_ENABLED", value),
                ("CREDGATE_LOG_PARSE_ERRORS", value),
            ]));
            assert_eq!(config, EngineConfig::default(), "{:?}", value);
        }
    }

    #[test]
    fn test_validate() {
        let mut config = EngineConfig::default();

        config.max_rule_len = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "CREDGATE_MAX_RULE_LEN"
        ));

        config.max_rule_len = MAX_LEN + 1;
        assert!(config.validate().is_err());

        config.max_rule_len = 64;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"enabled": false}"#).unwrap();
        assert!(!config.enabled);
        assert_eq!(config.max_rule_len, MAX_LEN);
    }
}
