// SPDX-License-Identifier: Apache-2.0

//! Engine configuration.
//!
//! Defaults are usable as-is; `from_env` overlays `DATASET_FEDERATION_*`
//! variables and `from_json_str` reads a JSON document.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::engine::error::{EngineError, EngineResult};

const ENV_MAX_CONCURRENT_FETCHES: &str = "DATASET_FEDERATION_MAX_CONCURRENT_FETCHES";
const ENV_LOG_DIR: &str = "DATASET_FEDERATION_LOG_DIR";
const ENV_LOG_RETENTION_DAYS: &str = "DATASET_FEDERATION_LOG_RETENTION_DAYS";
const ENV_LOG_FILTER: &str = "DATASET_FEDERATION_LOG";

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FederationConfig {
    /// Maximum number of connector fetches in flight per dataset run.
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory for daily rolling log files; stderr when unset.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_max_concurrent_fetches() -> usize {
    8
}
fn default_retention_days() -> u64 {
    14
}
fn default_filter() -> String {
    "dataset_federation=info".to_string()
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: default_max_concurrent_fetches(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: None,
            retention_days: default_retention_days(),
            filter: default_filter(),
        }
    }
}

impl FederationConfig {
    /// Defaults overlaid with environment variables.
    ///
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    pub fn from_json_str(raw: &str) -> EngineResult<Self> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|e| EngineError::invalid_config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.max_concurrent_fetches == 0 {
            return Err(EngineError::invalid_config(
                "max_concurrent_fetches must be at least 1",
            ));
        }
        Ok(())
    }

    fn with_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(limit) = var(ENV_MAX_CONCURRENT_FETCHES)
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|v| *v > 0)
        {
            self.max_concurrent_fetches = limit;
        }
        if let Some(dir) = var(ENV_LOG_DIR).filter(|v| !v.trim().is_empty()) {
            self.logging.directory = Some(PathBuf::from(dir));
        }
        if let Some(days) = var(ENV_LOG_RETENTION_DAYS).and_then(|v| v.trim().parse::<u64>().ok()) {
            self.logging.retention_days = days;
        }
        if let Some(filter) = var(ENV_LOG_FILTER).filter(|v| !v.trim().is_empty()) {
            self.logging.filter = filter;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        let config = FederationConfig::default();
        assert_eq!(config.max_concurrent_fetches, 8);
        assert_eq!(config.logging.retention_days, 14);
        assert!(config.logging.directory.is_none());
    }

    #[test]
    fn overrides_apply_and_bad_values_are_ignored() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_MAX_CONCURRENT_FETCHES, "3"),
            (ENV_LOG_DIR, "/tmp/logs"),
            (ENV_LOG_RETENTION_DAYS, "soon"),
        ]);
        let config = FederationConfig::default()
            .with_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.max_concurrent_fetches, 3);
        assert_eq!(config.logging.directory, Some(PathBuf::from("/tmp/logs")));
        assert_eq!(config.logging.retention_days, 14);
    }

    #[test]
    fn zero_limit_from_env_keeps_default() {
        let config = FederationConfig::default().with_overrides(|key| {
            (key == ENV_MAX_CONCURRENT_FETCHES).then(|| "0".to_string())
        });
        assert_eq!(config.max_concurrent_fetches, 8);
    }

    #[test]
    fn parses_partial_json() {
        let config = FederationConfig::from_json_str(r#"{ "max_concurrent_fetches": 2 }"#).unwrap();
        assert_eq!(config.max_concurrent_fetches, 2);
        assert_eq!(config.logging, LoggingConfig::default());

        let err =
            FederationConfig::from_json_str(r#"{ "max_concurrent_fetches": 0 }"#).unwrap_err();
        assert_eq!(err.kind(), "invalid_config");
    }
}
