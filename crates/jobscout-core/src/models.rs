use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::AppError;
use crate::util::{clean_opt, collapse_whitespace, fold};

pub const DEFAULT_RADIUS: u32 = 25;
pub const DEFAULT_LIMIT: usize = 20;
pub const DEFAULT_PAGE: usize = 1;
pub const MAX_LIMIT: usize = 100;
pub const MAX_RADIUS: u32 = 500;
pub const DEFAULT_RATE_WINDOW_SECS: u64 = 60;

/// Source name stamped on postings that come from the local store.
pub const USER_SUBMITTED_SOURCE: &str = "User Submitted";

// ---------------------------------------------------------------------------
// Search parameters
// ---------------------------------------------------------------------------

/// Input to a single aggregation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    pub query: Option<String>,
    pub location: Option<String>,
    /// Search radius in miles.
    pub radius: u32,
    pub salary_range: Option<String>,
    pub job_type: Option<String>,
    pub experience_level: Option<String>,
    pub remote: Option<bool>,
    /// Page size.
    pub limit: usize,
    /// 1-indexed page number.
    pub page: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            query: None,
            location: None,
            radius: DEFAULT_RADIUS,
            salary_range: None,
            job_type: None,
            experience_level: None,
            remote: None,
            limit: DEFAULT_LIMIT,
            page: DEFAULT_PAGE,
        }
    }
}

impl SearchParams {
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_page(mut self, page: usize, limit: usize) -> Self {
        self.page = page;
        self.limit = limit;
        self
    }

    /// Reject parameters a caller should be told about.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.page == 0 {
            return Err(AppError::InvalidParams("page must be at least 1".into()));
        }
        if self.limit == 0 || self.limit > MAX_LIMIT {
            return Err(AppError::InvalidParams(format!(
                "limit must be between 1 and {MAX_LIMIT}"
            )));
        }
        if self.radius > MAX_RADIUS {
            return Err(AppError::InvalidParams(format!(
                "radius must be at most {MAX_RADIUS}"
            )));
        }
        Ok(())
    }

    /// A copy with collapsed whitespace, blank strings dropped, and
    /// `page`/`limit` clamped into range.
    pub fn normalized(&self) -> Self {
        Self {
            query: clean_opt(self.query.as_deref()),
            location: clean_opt(self.location.as_deref()),
            radius: self.radius.min(MAX_RADIUS),
            salary_range: clean_opt(self.salary_range.as_deref()),
            job_type: clean_opt(self.job_type.as_deref()),
            experience_level: clean_opt(self.experience_level.as_deref()),
            remote: self.remote,
            limit: self.limit.clamp(1, MAX_LIMIT),
            page: self.page.max(1),
        }
    }

    /// Canonical cache key for these parameters.
    ///
    /// Built from a sorted map of the present, case-folded filter fields, so
    /// equal filters always hash identically. `page` and `limit` are not part
    /// of the key: the cache holds the full merged list for a filter set.
    pub fn cache_key(&self) -> String {
        let mut map: BTreeMap<&'static str, serde_json::Value> = BTreeMap::new();
        let mut put = |k: &'static str, v: &Option<String>| {
            if let Some(v) = v.as_deref().map(fold).filter(|v| !v.is_empty()) {
                map.insert(k, serde_json::Value::String(v));
            }
        };
        put("query", &self.query);
        put("location", &self.location);
        put("salary_range", &self.salary_range);
        put("job_type", &self.job_type);
        put("experience_level", &self.experience_level);
        map.insert("radius", serde_json::Value::from(self.radius));
        if let Some(remote) = self.remote {
            map.insert("remote", serde_json::Value::Bool(remote));
        }
        // A BTreeMap of JSON values always serializes.
        let canonical = serde_json::to_string(&map).unwrap_or_default();
        format!("search:{}", compute_hash(&canonical))
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Configuration entry for one external job provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSource {
    /// Unique display name, e.g. "Adzuna".
    pub name: String,
    /// Adapter identifier or base endpoint, e.g. "adzuna".
    pub api: String,
    /// Calls allowed per window. `0` means unlimited.
    pub rate_limit: u32,
    #[serde(default = "default_rate_window_secs")]
    pub rate_window_secs: u64,
    /// Lower = queried and preferred first.
    pub priority: i32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_rate_window_secs() -> u64 {
    DEFAULT_RATE_WINDOW_SECS
}

fn default_enabled() -> bool {
    true
}

impl JobSource {
    pub fn new(name: impl Into<String>, api: impl Into<String>, priority: i32) -> Self {
        Self {
            name: name.into(),
            api: api.into(),
            rate_limit: 0,
            rate_window_secs: DEFAULT_RATE_WINDOW_SECS,
            priority,
            enabled: true,
        }
    }

    pub fn with_rate_limit(mut self, calls: u32, window_secs: u64) -> Self {
        self.rate_limit = calls;
        self.rate_window_secs = window_secs;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn to_ref(&self) -> SourceRef {
        SourceRef {
            name: self.name.clone(),
            api: self.api.clone(),
            priority: self.priority,
        }
    }
}

/// Source metadata carried by value on every job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub name: String,
    pub api: String,
    pub priority: i32,
}

impl SourceRef {
    pub fn user_submitted() -> Self {
        Self {
            name: USER_SUBMITTED_SOURCE.to_string(),
            api: "database".to_string(),
            priority: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

/// Work arrangement label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RemoteLabel {
    #[serde(rename = "Remote")]
    Remote,
    #[default]
    #[serde(rename = "On-site")]
    OnSite,
    #[serde(rename = "Hybrid")]
    Hybrid,
}

impl RemoteLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteLabel::Remote => "Remote",
            RemoteLabel::OnSite => "On-site",
            RemoteLabel::Hybrid => "Hybrid",
        }
    }
}

impl fmt::Display for RemoteLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// The common record shape every provider's results are converted into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedJob {
    /// Unique within its source.
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary: Option<String>,
    pub job_type: String,
    pub experience: String,
    pub description: String,
    pub tags: BTreeSet<String>,
    pub source: SourceRef,
    pub source_url: Option<String>,
    pub remote: RemoteLabel,
    pub date_posted: DateTime<Utc>,
    pub logo: Option<String>,
    pub is_ai_recommended: bool,
}

impl NormalizedJob {
    /// Normalized (title, company, location) triple used for duplicate detection.
    pub fn dedup_key(&self) -> (String, String, String) {
        (fold(&self.title), fold(&self.company), fold(&self.location))
    }

    /// Display-ready copy of the free-text fields.
    pub fn tidy(mut self) -> Self {
        self.title = collapse_whitespace(&self.title);
        self.company = collapse_whitespace(&self.company);
        self.location = collapse_whitespace(&self.location);
        self
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Per-source outcome of one aggregation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    /// Responded; `jobs` is how many records it returned before dedupe.
    Ok { jobs: usize },
    Failed { error: String },
    TimedOut,
    /// Skipped: window budget exhausted.
    RateLimited,
    /// Skipped: circuit breaker open after repeated failures.
    CircuitOpen,
    /// Skipped: no adapter registered for this source.
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReport {
    pub source: String,
    #[serde(flatten)]
    pub status: SourceStatus,
    pub elapsed_ms: u64,
}

/// Unified result of one aggregation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationResult {
    /// Deduplicated, sorted, pre-pagination list.
    pub jobs: Vec<NormalizedJob>,
    /// Count before pagination.
    pub total: usize,
    /// Names of the sources present in `jobs`, in priority order.
    pub sources: Vec<String>,
    pub cache_hit: bool,
    pub execution_time_ms: u64,
    pub diagnostics: Vec<SourceReport>,
}

impl AggregationResult {
    pub fn empty() -> Self {
        Self {
            jobs: Vec::new(),
            total: 0,
            sources: Vec::new(),
            cache_hit: false,
            execution_time_ms: 0,
            diagnostics: Vec::new(),
        }
    }
}

/// Compute a SHA-256 hash of a string, returned as 64-char hex.
pub fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
