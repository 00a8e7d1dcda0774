//! Dispatcher configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default bound on pipelines running at once within one cycle.
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Pipelines allowed to run concurrently. `1` processes the batch
    /// one message at a time.
    pub max_concurrency: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

impl DispatchConfig {
    pub fn sequential() -> Self {
        Self { max_concurrency: 1 }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrency == 0 {
            return Err(ConfigError::invalid(
                "dispatch.max_concurrency",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: DispatchConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, DispatchConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let config = DispatchConfig { max_concurrency: 0 };
        let err = config.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid value for dispatch.max_concurrency: must be at least 1"
        );
    }
}
