//! Configuration for the diff engine.
//!
//! `DiffConfig` centralizes the matching thresholds and behavioral knobs so
//! the engine carries no hardcoded constants of its own.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How rows left over after exact matching are paired up as modifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Old rows in ascending order each claim their best remaining new row.
    #[default]
    Greedy,
    /// Global assignment maximizing total similarity across the sheet.
    Optimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    /// Minimum similarity score for two unmatched rows to count as one modified row.
    pub similarity_threshold: f64,
    pub match_strategy: MatchStrategy,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.5,
            match_strategy: MatchStrategy::Greedy,
        }
    }
}

impl DiffConfig {
    pub fn builder() -> DiffConfigBuilder {
        DiffConfigBuilder {
            inner: DiffConfig::default(),
        }
    }

    /// Parse a config from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<DiffConfig, ConfigError> {
        let config: DiffConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.similarity_threshold;
        if !threshold.is_finite() || threshold <= 0.0 || threshold > 1.0 {
            return Err(ConfigError::InvalidThreshold { value: threshold });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("[EXROW_CFG_001] similarity_threshold must be in (0, 1], got {value}")]
    InvalidThreshold { value: f64 },
    #[error("[EXROW_CFG_002] invalid config JSON: {0}")]
    Parse(String),
}

pub struct DiffConfigBuilder {
    inner: DiffConfig,
}

impl DiffConfigBuilder {
    pub fn similarity_threshold(mut self, value: f64) -> Self {
        self.inner.similarity_threshold = value;
        self
    }

    pub fn match_strategy(mut self, value: MatchStrategy) -> Self {
        self.inner.match_strategy = value;
        self
    }

    pub fn build(self) -> Result<DiffConfig, ConfigError> {
        self.inner.validate()?;
        Ok(self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_greedy_half() {
        let config = DiffConfig::default();
        assert_eq!(config.similarity_threshold, 0.5);
        assert_eq!(config.match_strategy, MatchStrategy::Greedy);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_rejects_out_of_range_threshold() {
        for bad in [0.0, -0.1, 1.5, f64::NAN] {
            let err = DiffConfig::builder()
                .similarity_threshold(bad)
                .build()
                .expect_err("threshold should be rejected");
            assert!(matches!(err, ConfigError::InvalidThreshold { .. }));
        }
    }

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let config = DiffConfig::from_json(r#"{"match_strategy":"optimal"}"#).expect("parse");
        assert_eq!(config.match_strategy, MatchStrategy::Optimal);
        assert_eq!(config.similarity_threshold, 0.5);
    }

    #[test]
    fn json_errors_are_reported() {
        let err = DiffConfig::from_json("{not json").expect_err("should fail");
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
