use std::path::PathBuf;
use std::time::Duration;

use crate::circuit_breaker::CircuitBreakerConfig;
use crate::error::AppError;
use crate::registry::SourceRegistry;

pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_millis(4000);
pub const DEFAULT_AGGREGATION_TIMEOUT: Duration = Duration::from_millis(5000);
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
pub const DEFAULT_CACHE_CAPACITY: u64 = 1000;

/// Runtime knobs for the aggregator.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Bound on a single adapter call.
    pub provider_timeout: Duration,
    /// Bound on the whole fan-out; always at least `provider_timeout`.
    pub aggregation_timeout: Duration,
    pub cache_ttl: Duration,
    pub cache_capacity: u64,
    /// `None` disables per-source circuit breakers.
    pub circuit_breaker: Option<CircuitBreakerConfig>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
            aggregation_timeout: DEFAULT_AGGREGATION_TIMEOUT,
            cache_ttl: DEFAULT_CACHE_TTL,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            circuit_breaker: Some(CircuitBreakerConfig::default()),
        }
    }
}

impl AggregatorConfig {
    /// Read configuration from environment variables.
    ///
    /// - `JOBSCOUT_PROVIDER_TIMEOUT_MS` (default 4000)
    /// - `JOBSCOUT_AGGREGATION_TIMEOUT_MS` (default 5000)
    /// - `JOBSCOUT_CACHE_TTL_SECS` (default 300)
    /// - `JOBSCOUT_CACHE_CAPACITY` (default 1000)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let read = |key: &str, default: u64| -> Result<u64, AppError> {
            match lookup(key) {
                None => Ok(default),
                Some(raw) => {
                    let parsed: u64 = raw.trim().parse().map_err(|_| {
                        AppError::ConfigError(format!(
                            "Invalid {key} '{raw}': must be a positive integer"
                        ))
                    })?;
                    if parsed == 0 {
                        return Err(AppError::ConfigError(format!("{key} must be at least 1")));
                    }
                    Ok(parsed)
                }
            }
        };

        let config = Self {
            provider_timeout: Duration::from_millis(read(
                "JOBSCOUT_PROVIDER_TIMEOUT_MS",
                DEFAULT_PROVIDER_TIMEOUT.as_millis() as u64,
            )?),
            aggregation_timeout: Duration::from_millis(read(
                "JOBSCOUT_AGGREGATION_TIMEOUT_MS",
                DEFAULT_AGGREGATION_TIMEOUT.as_millis() as u64,
            )?),
            cache_ttl: Duration::from_secs(read(
                "JOBSCOUT_CACHE_TTL_SECS",
                DEFAULT_CACHE_TTL.as_secs(),
            )?),
            cache_capacity: read("JOBSCOUT_CACHE_CAPACITY", DEFAULT_CACHE_CAPACITY)?,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.provider_timeout > self.aggregation_timeout {
            return Err(AppError::ConfigError(format!(
                "Provider timeout ({} ms) must not exceed aggregation timeout ({} ms)",
                self.provider_timeout.as_millis(),
                self.aggregation_timeout.as_millis()
            )));
        }
        Ok(())
    }
}

/// Load the source registry named by `JOBSCOUT_SOURCES_FILE`, falling back
/// to [`SourceRegistry::builtin`].
pub fn load_registry() -> Result<SourceRegistry, AppError> {
    match std::env::var("JOBSCOUT_SOURCES_FILE") {
        Ok(path) => {
            let path = PathBuf::from(path);
            tracing::info!(path = %path.display(), "Loading source registry");
            SourceRegistry::from_json_file(&path)
        }
        Err(_) => Ok(SourceRegistry::builtin()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = AggregatorConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.provider_timeout, DEFAULT_PROVIDER_TIMEOUT);
        assert_eq!(config.aggregation_timeout, DEFAULT_AGGREGATION_TIMEOUT);
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.cache_capacity, 1000);
        assert!(config.circuit_breaker.is_some());
    }

    #[test]
    fn reads_overrides() {
        let config = AggregatorConfig::from_lookup(lookup(&[
            ("JOBSCOUT_PROVIDER_TIMEOUT_MS", "1500"),
            ("JOBSCOUT_AGGREGATION_TIMEOUT_MS", "2000"),
            ("JOBSCOUT_CACHE_TTL_SECS", "60"),
            ("JOBSCOUT_CACHE_CAPACITY", "10"),
        ]))
        .unwrap();
        assert_eq!(config.provider_timeout, Duration::from_millis(1500));
        assert_eq!(config.aggregation_timeout, Duration::from_millis(2000));
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.cache_capacity, 10);
    }

    #[test]
    fn rejects_garbage_and_zero() {
        let err = AggregatorConfig::from_lookup(lookup(&[("JOBSCOUT_CACHE_TTL_SECS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
        assert!(
            AggregatorConfig::from_lookup(lookup(&[("JOBSCOUT_CACHE_CAPACITY", "0")])).is_err()
        );
    }

    #[test]
    fn global_timeout_must_dominate() {
        let err = AggregatorConfig::from_lookup(lookup(&[
            ("JOBSCOUT_PROVIDER_TIMEOUT_MS", "9000"),
            ("JOBSCOUT_AGGREGATION_TIMEOUT_MS", "5000"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("must not exceed"));
    }
}
