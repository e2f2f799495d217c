//! Search configuration.
//!
//! [`SearchConfig`] can be built in code with the builder methods or loaded
//! from a TOML file:
//!
//! ```toml
//! exploration_rate = 1.4
//! play_limit = 400
//! time_limit_ms = 250
//! workers = 4
//! seed = 7
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{DEFAULT_EXPLORATION_RATE, DEFAULT_PLAY_LIMIT, DEFAULT_WORKERS};
use crate::error::ConfigError;

/// Configuration for a search [`Engine`](crate::search::Engine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Weight of the exploration bonus in the selection formula.
    pub exploration_rate: f64,

    /// Wall-clock budget per `find_move` call, in milliseconds.
    pub time_limit_ms: Option<u64>,

    /// Root visit budget per `find_move` call.
    pub play_limit: Option<u32>,

    /// Number of independent search workers. Values above one enable
    /// parallel search with a post-hoc tree merge.
    pub workers: usize,

    /// Seed for the engine's random number generator.
    pub seed: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            exploration_rate: DEFAULT_EXPLORATION_RATE,
            time_limit_ms: None,
            play_limit: Some(DEFAULT_PLAY_LIMIT),
            workers: DEFAULT_WORKERS,
            seed: None,
        }
    }
}

impl SearchConfig {
    /// Create a small deterministic config for tests.
    pub fn for_testing() -> Self {
        Self {
            exploration_rate: DEFAULT_EXPLORATION_RATE,
            time_limit_ms: None,
            play_limit: Some(50),
            workers: 1,
            seed: Some(42),
        }
    }

    /// Builder pattern: set the exploration rate.
    pub fn with_exploration_rate(mut self, rate: f64) -> Self {
        self.exploration_rate = rate;
        self
    }

    /// Builder pattern: set the wall-clock budget.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit_ms = Some(limit.as_millis() as u64);
        self
    }

    /// Builder pattern: set the root visit budget.
    pub fn with_play_limit(mut self, plays: u32) -> Self {
        self.play_limit = Some(plays);
        self
    }

    /// Builder pattern: remove the root visit budget.
    pub fn without_play_limit(mut self) -> Self {
        self.play_limit = None;
        self
    }

    /// Builder pattern: set the number of workers.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Builder pattern: set the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// The configured wall-clock budget.
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_ms.map(Duration::from_millis)
    }

    /// Check the invariants the engine relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.exploration_rate.is_finite() || self.exploration_rate < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "exploration_rate must be a non-negative number, got {}",
                self.exploration_rate
            )));
        }
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Load and validate a configuration from a TOML file.
    ///
    /// Missing keys fall back to [`SearchConfig::default`].
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        debug!(path = %path.display(), ?config, "Loaded search config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SearchConfig::default();
        assert_eq!(config.play_limit, Some(DEFAULT_PLAY_LIMIT));
        assert_eq!(config.workers, 1);
        assert!(config.time_limit().is_none());
        assert!((config.exploration_rate - DEFAULT_EXPLORATION_RATE).abs() < 1e-12);
    }

    #[test]
    fn test_builder_pattern() {
        let config = SearchConfig::default()
            .with_play_limit(100)
            .with_time_limit(Duration::from_millis(250))
            .with_workers(3)
            .with_exploration_rate(0.5);

        assert_eq!(config.play_limit, Some(100));
        assert_eq!(config.time_limit(), Some(Duration::from_millis(250)));
        assert_eq!(config.workers, 3);
        assert!((config.exploration_rate - 0.5).abs() < 1e-12);

        let config = config.without_play_limit();
        assert!(config.play_limit.is_none());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(SearchConfig::default().with_workers(0).validate().is_err());
        assert!(
            SearchConfig::default()
                .with_exploration_rate(-1.0)
                .validate()
                .is_err()
        );
        assert!(
            SearchConfig::default()
                .with_exploration_rate(f64::NAN)
                .validate()
                .is_err()
        );
        assert!(SearchConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: SearchConfig = toml::from_str("workers = 4\ntime_limit_ms = 20").unwrap();
        assert_eq!(config.workers, 4);
        assert_eq!(config.time_limit(), Some(Duration::from_millis(20)));
        assert_eq!(config.play_limit, Some(DEFAULT_PLAY_LIMIT));
    }

    #[test]
    fn test_load_missing_file() {
        let result = SearchConfig::load_from_path("/nonexistent/blackbird.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
