//! Pipeline configuration.
//!
//! Loaded from YAML (usually the `pipeline` section of an application's settings file)
//! or built in code, then optionally overridden from the environment:
//!
//! ```yaml
//! cache:
//!   sliding_expiration_days: 2
//!   max_entries: 50000
//! ```
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `PIPELINE_CACHE_SLIDING_EXPIRATION_DAYS` | `cache.sliding_expiration_days` |
//! | `PIPELINE_CACHE_MAX_ENTRIES` | `cache.max_entries` |

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::{Error, ErrorContext, Result};

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Sliding expiration for cacheable requests that do not declare their own.
    pub sliding_expiration_days: u64,
    /// Capacity of the in-process store.
    pub max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            sliding_expiration_days: 1,
            max_entries: 10_000,
        }
    }
}

impl CacheSettings {
    pub fn sliding_expiration(&self) -> Duration {
        Duration::from_secs(self.sliding_expiration_days.saturating_mul(SECONDS_PER_DAY))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub cache: CacheSettings,
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sliding_expiration_days(mut self, days: u64) -> Self {
        self.cache.sliding_expiration_days = days;
        self
    }

    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.cache.max_entries = max;
        self
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|e| {
            Error::configuration_with_context(
                "invalid pipeline configuration",
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("config"),
            )
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration_with_context(
                format!("cannot read {}", path.display()),
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("config"),
            )
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Applies `PIPELINE_*` environment overrides on top of `self`.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(raw) = lookup("PIPELINE_CACHE_SLIDING_EXPIRATION_DAYS") {
            self.cache.sliding_expiration_days =
                parse_override("PIPELINE_CACHE_SLIDING_EXPIRATION_DAYS", &raw)?;
        }
        if let Some(raw) = lookup("PIPELINE_CACHE_MAX_ENTRIES") {
            self.cache.max_entries = parse_override("PIPELINE_CACHE_MAX_ENTRIES", &raw)?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache.sliding_expiration_days == 0 {
            return Err(Error::configuration_with_context(
                "default sliding expiration must be at least one day",
                ErrorContext::new()
                    .with_field_path("cache.sliding_expiration_days")
                    .with_source("config"),
            ));
        }
        if self.cache.max_entries == 0 {
            return Err(Error::configuration_with_context(
                "store capacity must be positive",
                ErrorContext::new()
                    .with_field_path("cache.max_entries")
                    .with_source("config"),
            ));
        }
        Ok(())
    }
}

fn parse_override<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| {
        Error::configuration_with_context(
            format!("invalid value for {}", name),
            ErrorContext::new()
                .with_field_path(name)
                .with_details(format!("{:?}: {}", raw, e))
                .with_source("config"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.cache.sliding_expiration_days, 1);
        assert_eq!(config.cache.sliding_expiration(), Duration::from_secs(86_400));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn yaml_with_partial_sections() {
        let config = PipelineConfig::from_yaml_str("cache:\n  sliding_expiration_days: 3\n").unwrap();
        assert_eq!(config.cache.sliding_expiration_days, 3);
        assert_eq!(config.cache.max_entries, 10_000);

        let empty = PipelineConfig::from_yaml_str("{}").unwrap();
        assert_eq!(empty, PipelineConfig::default());
    }

    #[test]
    fn zero_expiration_is_rejected() {
        let err = PipelineConfig::from_yaml_str("cache:\n  sliding_expiration_days: 0\n").unwrap_err();
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("cache.sliding_expiration_days")
        );
    }

    #[test]
    fn malformed_yaml_is_a_configuration_error() {
        let err = PipelineConfig::from_yaml_str("cache: [").unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn overrides_apply_and_validate() {
        let vars: HashMap<&str, &str> = [
            ("PIPELINE_CACHE_SLIDING_EXPIRATION_DAYS", "7"),
            ("PIPELINE_CACHE_MAX_ENTRIES", " 250 "),
        ]
        .into_iter()
        .collect();
        let config = PipelineConfig::new()
            .with_overrides_from(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.cache.sliding_expiration_days, 7);
        assert_eq!(config.cache.max_entries, 250);

        let err = PipelineConfig::new()
            .with_overrides_from(|k| {
                (k == "PIPELINE_CACHE_MAX_ENTRIES").then(|| "lots".to_string())
            })
            .unwrap_err();
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("PIPELINE_CACHE_MAX_ENTRIES")
        );
    }
}
