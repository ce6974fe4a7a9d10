//! Engine configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default per-call bound on native store reads.
pub const DEFAULT_NATIVE_TIMEOUT_MS: u64 = 5_000;
/// Default bound on a single cloud history request.
pub const DEFAULT_CLOUD_TIMEOUT_MS: u64 = 15_000;
/// Default cap on concurrent reads during a snapshot fan-out.
pub const DEFAULT_MAX_CONCURRENT_READS: usize = 20;

/// How a series' trend baseline is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendPolicy {
    /// Compare against the equal-length window right before the request.
    PrecedingWindow,
    /// Skip the baseline read; trend is always 0.
    Off,
}

/// Tunables for [`MetricAggregationEngine`](crate::engine::MetricAggregationEngine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub native_timeout_ms: u64,
    pub cloud_timeout_ms: u64,
    pub max_concurrent_reads: usize,
    pub trend: TrendPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            native_timeout_ms: DEFAULT_NATIVE_TIMEOUT_MS,
            cloud_timeout_ms: DEFAULT_CLOUD_TIMEOUT_MS,
            max_concurrent_reads: DEFAULT_MAX_CONCURRENT_READS,
            trend: TrendPolicy::PrecedingWindow,
        }
    }
}

impl EngineConfig {
    /// Load and validate a JSON config file. Missing fields take defaults.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.native_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "native_timeout_ms must be greater than 0".into(),
            ));
        }
        if self.cloud_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "cloud_timeout_ms must be greater than 0".into(),
            ));
        }
        if self.max_concurrent_reads == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrent_reads must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn native_timeout(&self) -> Duration {
        Duration::from_millis(self.native_timeout_ms)
    }

    pub fn cloud_timeout(&self) -> Duration {
        Duration::from_millis(self.cloud_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let c = EngineConfig::default();
        assert_eq!(c.native_timeout(), Duration::from_secs(5));
        assert_eq!(c.max_concurrent_reads, 20);
        assert_eq!(c.trend, TrendPolicy::PrecedingWindow);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_from_path_partial_fills_defaults() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"native_timeout_ms": 250, "trend": "off"}}"#).unwrap();
        let c = EngineConfig::from_path(f.path()).unwrap();
        assert_eq!(c.native_timeout_ms, 250);
        assert_eq!(c.trend, TrendPolicy::Off);
        assert_eq!(c.cloud_timeout_ms, DEFAULT_CLOUD_TIMEOUT_MS);
        assert_eq!(c.max_concurrent_reads, DEFAULT_MAX_CONCURRENT_READS);
    }

    #[test]
    fn test_from_path_rejects_zero_concurrency() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"max_concurrent_reads": 0}}"#).unwrap();
        let err = EngineConfig::from_path(f.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_from_path_bad_json() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "not json").unwrap();
        let err = EngineConfig::from_path(f.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_path_missing_file() {
        let err = EngineConfig::from_path(Path::new("/nonexistent/vitalsync.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
