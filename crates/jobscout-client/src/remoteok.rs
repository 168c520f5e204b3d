use async_trait::async_trait;
use chrono::Utc;
use jobscout_core::error::AppError;
use jobscout_core::models::{NormalizedJob, RemoteLabel, SearchParams, SourceRef};
use jobscout_core::traits::ProviderAdapter;
use jobscout_core::util::{clean_opt, collapse_whitespace, fold};
use serde::Deserialize;

use crate::cleaner::DescriptionCleaner;
use crate::http::HttpClient;
use crate::normalize::{
    LocalFilter, RawId, format_salary, infer_experience, namespaced_id, parse_date,
};

pub const DEFAULT_BASE_URL: &str = "https://remoteok.com";
const MAX_RESULTS: usize = 50;

#[derive(Debug, Deserialize)]
struct RemoteOkJob {
    id: RawId,
    #[serde(default)]
    position: String,
    #[serde(default)]
    company: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    tags: Vec<String>,
    date: Option<String>,
    url: Option<String>,
    apply_url: Option<String>,
    salary_min: Option<f64>,
    salary_max: Option<f64>,
    company_logo: Option<String>,
    logo: Option<String>,
}

/// RemoteOK public feed. The API has no search parameters, so filtering
/// happens here.
pub struct RemoteOkAdapter {
    source: String,
    http: HttpClient,
    cleaner: DescriptionCleaner,
    base_url: String,
}

impl RemoteOkAdapter {
    pub fn new(source: impl Into<String>, http: HttpClient) -> Self {
        Self {
            source: source.into(),
            http,
            cleaner: DescriptionCleaner::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn normalize(&self, job: RemoteOkJob) -> NormalizedJob {
        let title = collapse_whitespace(&job.position);
        NormalizedJob {
            id: namespaced_id("remoteok", &job.id),
            experience: infer_experience(&title),
            company: collapse_whitespace(&job.company),
            location: if job.location.trim().is_empty() {
                "Remote".to_string()
            } else {
                collapse_whitespace(&job.location)
            },
            salary: format_salary(job.salary_min, job.salary_max, "$"),
            job_type: "Full-time".to_string(),
            description: self.cleaner.description(&job.description),
            tags: job.tags.iter().map(|t| fold(t)).filter(|t| !t.is_empty()).collect(),
            source: SourceRef {
                name: self.source.clone(),
                api: "remoteok".to_string(),
                priority: 0,
            },
            source_url: job.apply_url.or(job.url),
            remote: RemoteLabel::Remote,
            date_posted: parse_date(job.date.as_deref(), Utc::now()),
            logo: clean_opt(job.company_logo.as_deref()).or_else(|| clean_opt(job.logo.as_deref())),
            is_ai_recommended: false,
            title,
        }
    }
}

#[async_trait]
impl ProviderAdapter for RemoteOkAdapter {
    fn source_name(&self) -> &str {
        &self.source
    }

    async fn fetch(&self, params: &SearchParams) -> Result<Vec<NormalizedJob>, AppError> {
        if params.remote == Some(false) {
            return Ok(Vec::new());
        }

        let feed: Vec<serde_json::Value> = self.http.get_json(&self.base_url, "/api", &[]).await?;
        let filter = LocalFilter::new(params);

        // The first element is a legal notice, not a job.
        let jobs: Vec<NormalizedJob> = feed
            .into_iter()
            .skip(1)
            .filter_map(|value| match serde_json::from_value::<RemoteOkJob>(value) {
                Ok(job) => Some(job),
                Err(e) => {
                    tracing::debug!(error = %e, "Skipping malformed RemoteOK entry");
                    None
                }
            })
            .filter(|job| {
                let tags = job.tags.join(" ");
                filter.matches_query(&[job.position.as_str(), tags.as_str(), job.company.as_str()])
            })
            .map(|job| self.normalize(job))
            .filter(|job| filter.matches_location(&job.location, job.remote))
            .take(MAX_RESULTS)
            .collect();

        tracing::debug!(source = %self.source, results = jobs.len(), "RemoteOK responded");
        Ok(jobs)
    }
}
