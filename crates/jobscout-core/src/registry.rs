use std::collections::HashSet;
use std::path::Path;

use crate::error::AppError;
use crate::models::JobSource;

/// Immutable set of configured job sources, ordered by `(priority, name)`.
///
/// Loaded once at startup and shared (via `Arc`) by everything that needs to
/// know which providers exist.
#[derive(Debug, Clone)]
pub struct SourceRegistry {
    sources: Vec<JobSource>,
}

impl SourceRegistry {
    pub fn new(mut sources: Vec<JobSource>) -> Result<Self, AppError> {
        let mut seen = HashSet::new();
        for source in &sources {
            if source.name.trim().is_empty() {
                return Err(AppError::ConfigError("Source name must not be empty".into()));
            }
            if !seen.insert(source.name.clone()) {
                return Err(AppError::ConfigError(format!(
                    "Duplicate source name '{}'",
                    source.name
                )));
            }
            if source.rate_limit > 0 && source.rate_window_secs == 0 {
                return Err(AppError::ConfigError(format!(
                    "Source '{}' has a rate limit but a zero-second window",
                    source.name
                )));
            }
        }
        sources.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.name.cmp(&b.name)));
        Ok(Self { sources })
    }

    /// Parse a JSON array of sources.
    pub fn from_json(json: &str) -> Result<Self, AppError> {
        let sources: Vec<JobSource> = serde_json::from_str(json)
            .map_err(|e| AppError::ConfigError(format!("Invalid source registry JSON: {e}")))?;
        Self::new(sources)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, AppError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            AppError::ConfigError(format!(
                "Failed to read source registry {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json(&json)
    }

    /// The registry used when no file is configured.
    pub fn builtin() -> Self {
        Self {
            sources: vec![
                JobSource::new("Adzuna", "adzuna", 1).with_rate_limit(25, 60),
                JobSource::new("RemoteOK", "remoteok", 2).with_rate_limit(10, 60),
                JobSource::new("Arbeitnow", "arbeitnow", 3).with_rate_limit(30, 60),
            ],
        }
    }

    /// All sources in priority order.
    pub fn all(&self) -> &[JobSource] {
        &self.sources
    }

    /// Enabled sources in priority order.
    pub fn enabled(&self) -> impl Iterator<Item = &JobSource> {
        self.sources.iter().filter(|s| s.enabled)
    }

    pub fn get(&self, name: &str) -> Option<&JobSource> {
        self.sources.iter().find(|s| s.name == name)
    }

    pub fn priority_of(&self, name: &str) -> Option<i32> {
        self.get(name).map(|s| s.priority)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
