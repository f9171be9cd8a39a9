use crate::core::ConfigError;
use crate::retry::RetryPolicy;
use crate::storage::MemoryStoreConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Prefix of the environment variables read by [`EngineConfig::from_env`].
pub const ENV_PREFIX: &str = "LIKETOGGLE_";

/// Toggle engine configuration
///
/// Every field has a default, so a JSON document only needs the keys it
/// changes:
///
/// ```json
/// { "retry": { "max_attempts": 10 }, "store": { "op_latency_ms": 2 } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub retry: RetryPolicy,
    pub store: MemoryStoreConfig,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the retry policy
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Set the in-memory store settings
    pub fn store(mut self, store: MemoryStoreConfig) -> Self {
        self.store = store;
        self
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Defaults overridden by `LIKETOGGLE_*` variables of the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides(std::env::vars())
    }

    /// Applies `LIKETOGGLE_*` overrides from `vars`; other keys are ignored.
    pub fn with_env_overrides<I, K, V>(mut self, vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let (key, value) = (key.as_ref(), value.as_ref().trim());
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match name {
                "MAX_ATTEMPTS" => self.retry.max_attempts = parse_var(key, value)?,
                "INITIAL_INTERVAL_MS" => self.retry.initial_interval_ms = parse_var(key, value)?,
                "MULTIPLIER" => self.retry.multiplier = parse_var(key, value)?,
                "MAX_INTERVAL_MS" => self.retry.max_interval_ms = parse_var(key, value)?,
                "JITTER" => self.retry.jitter = parse_var(key, value)?,
                "OP_LATENCY_MS" => self.store.op_latency_ms = parse_var(key, value)?,
                _ => {}
            }
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.retry.validate().map_err(ConfigError::Invalid)
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            EngineConfig::from_json_str(r#"{ "retry": { "max_attempts": 10 } }"#).unwrap();
        assert_eq!(config.retry.max_attempts, 10);
        assert_eq!(config.retry.initial_interval_ms, 200);
        assert_eq!(config.retry.multiplier, 1.8);
        assert_eq!(config.store, MemoryStoreConfig::default());
    }

    #[test]
    fn test_invalid_policy_is_rejected() {
        let err = EngineConfig::from_json_str(r#"{ "retry": { "multiplier": 0.5 } }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_env_overrides() {
        let vars = [
            ("LIKETOGGLE_MAX_ATTEMPTS", "3"),
            ("LIKETOGGLE_JITTER", "0"),
            ("LIKETOGGLE_OP_LATENCY_MS", "5"),
            ("PATH", "/usr/bin"),
        ];
        let config = EngineConfig::default().with_env_overrides(vars).unwrap();
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.jitter, 0.0);
        assert_eq!(config.store.op_latency_ms, 5);
    }

    #[test]
    fn test_env_override_parse_error_names_the_key() {
        let err = EngineConfig::default()
            .with_env_overrides([("LIKETOGGLE_MULTIPLIER", "fast")])
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid value for LIKETOGGLE_MULTIPLIER: 'fast'"
        );
    }
}
