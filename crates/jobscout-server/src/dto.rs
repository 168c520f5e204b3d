use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use jobscout_core::models::{
    AggregationResult, NormalizedJob, SearchParams, SourceReport, SourceStatus,
};
use jobscout_core::pagination::Page;

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct SearchQuery {
    /// Free-text keywords
    pub q: Option<String>,
    pub location: Option<String>,
    /// Search radius in miles (default 25)
    pub radius: Option<u32>,
    /// e.g. "50000-80000" or "60k+"
    pub salary_range: Option<String>,
    pub job_type: Option<String>,
    pub experience_level: Option<String>,
    pub remote: Option<bool>,
    /// 1-indexed page (default 1)
    pub page: Option<usize>,
    /// Page size, 1-100 (default 20)
    pub limit: Option<usize>,
}

impl SearchQuery {
    pub fn into_params(self) -> SearchParams {
        let defaults = SearchParams::default();
        SearchParams {
            query: self.q,
            location: self.location,
            radius: self.radius.unwrap_or(defaults.radius),
            salary_range: self.salary_range,
            job_type: self.job_type,
            experience_level: self.experience_level,
            remote: self.remote,
            limit: self.limit.unwrap_or(defaults.limit),
            page: self.page.unwrap_or(defaults.page),
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct JobResponse {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary: Option<String>,
    pub job_type: String,
    pub experience: String,
    pub description: String,
    pub tags: Vec<String>,
    /// Source display name
    pub source: String,
    pub source_url: Option<String>,
    /// "Remote", "On-site" or "Hybrid"
    pub remote: String,
    pub date_posted: DateTime<Utc>,
    pub logo: Option<String>,
    pub is_ai_recommended: bool,
}

impl From<&NormalizedJob> for JobResponse {
    fn from(job: &NormalizedJob) -> Self {
        Self {
            id: job.id.clone(),
            title: job.title.clone(),
            company: job.company.clone(),
            location: job.location.clone(),
            salary: job.salary.clone(),
            job_type: job.job_type.clone(),
            experience: job.experience.clone(),
            description: job.description.clone(),
            tags: job.tags.iter().cloned().collect(),
            source: job.source.name.clone(),
            source_url: job.source_url.clone(),
            remote: job.remote.to_string(),
            date_posted: job.date_posted,
            logo: job.logo.clone(),
            is_ai_recommended: job.is_ai_recommended,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SourceReportResponse {
    pub source: String,
    /// ok, failed, timed_out, rate_limited, circuit_open or unavailable
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl From<&SourceReport> for SourceReportResponse {
    fn from(report: &SourceReport) -> Self {
        let (status, jobs, error) = match &report.status {
            SourceStatus::Ok { jobs } => ("ok", Some(*jobs), None),
            SourceStatus::Failed { error } => ("failed", None, Some(error.clone())),
            SourceStatus::TimedOut => ("timed_out", None, None),
            SourceStatus::RateLimited => ("rate_limited", None, None),
            SourceStatus::CircuitOpen => ("circuit_open", None, None),
            SourceStatus::Unavailable => ("unavailable", None, None),
        };
        Self {
            source: report.source.clone(),
            status,
            jobs,
            error,
            elapsed_ms: report.elapsed_ms,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SearchResponse {
    pub jobs: Vec<JobResponse>,
    /// Jobs across all pages
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub total_pages: usize,
    pub has_more: bool,
    pub sources: Vec<String>,
    pub cache_hit: bool,
    pub execution_time_ms: u64,
    pub diagnostics: Vec<SourceReportResponse>,
}

impl SearchResponse {
    pub fn new(result: &AggregationResult, page: &Page<'_, NormalizedJob>) -> Self {
        Self {
            jobs: page.items.iter().map(JobResponse::from).collect(),
            total: page.total,
            page: page.page,
            limit: page.limit,
            total_pages: page.total_pages,
            has_more: page.has_more,
            sources: result.sources.clone(),
            cache_hit: result.cache_hit,
            execution_time_ms: result.execution_time_ms,
            diagnostics: result.diagnostics.iter().map(Into::into).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SourceResponse {
    pub name: String,
    pub api: String,
    pub priority: i32,
    pub enabled: bool,
    /// Calls per window; 0 means unlimited
    pub rate_limit: u32,
    pub rate_window_secs: u64,
    /// Calls left in the current window (None when unlimited)
    pub remaining: Option<u32>,
    /// Whether an adapter is configured for this source
    pub available: bool,
    /// Circuit breaker state, when breakers are enabled
    pub circuit: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SourceListResponse {
    pub sources: Vec<SourceResponse>,
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
