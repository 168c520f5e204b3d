use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use jobscout_core::error::AppError;
use jobscout_core::models::{NormalizedJob, SearchParams, SourceRef};
use jobscout_core::traits::ProviderAdapter;
use jobscout_core::util::{collapse_whitespace, fold};
use serde::Deserialize;

use crate::cleaner::DescriptionCleaner;
use crate::http::HttpClient;
use crate::normalize::{LocalFilter, infer_experience, job_type_label, remote_label};

pub const DEFAULT_BASE_URL: &str = "https://www.arbeitnow.com";

#[derive(Debug, Deserialize)]
struct BoardResponse {
    #[serde(default)]
    data: Vec<ArbeitnowJob>,
}

#[derive(Debug, Deserialize)]
struct ArbeitnowJob {
    slug: String,
    #[serde(default)]
    company_name: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    remote: bool,
    url: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    job_types: Vec<String>,
    #[serde(default)]
    location: String,
    /// Unix seconds.
    created_at: Option<i64>,
}

/// Arbeitnow job board API (Europe-focused, no server-side search).
pub struct ArbeitnowAdapter {
    source: String,
    http: HttpClient,
    cleaner: DescriptionCleaner,
    base_url: String,
}

impl ArbeitnowAdapter {
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

    fn normalize(&self, job: ArbeitnowJob) -> NormalizedJob {
        let title = collapse_whitespace(&job.title);
        let location = collapse_whitespace(&job.location);
        let date_posted = job
            .created_at
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
            .unwrap_or_else(Utc::now);

        NormalizedJob {
            id: format!("arbeitnow-{}", job.slug),
            remote: remote_label(Some(job.remote), &[location.as_str()]),
            experience: infer_experience(&title),
            company: collapse_whitespace(&job.company_name),
            salary: None,
            job_type: job
                .job_types
                .first()
                .map(|t| job_type_label(t))
                .unwrap_or_else(|| "Not specified".to_string()),
            description: self.cleaner.description(&job.description),
            tags: job.tags.iter().map(|t| fold(t)).filter(|t| !t.is_empty()).collect(),
            source: SourceRef {
                name: self.source.clone(),
                api: "arbeitnow".to_string(),
                priority: 0,
            },
            source_url: job.url,
            date_posted,
            logo: None,
            is_ai_recommended: false,
            title,
            location,
        }
    }
}

#[async_trait]
impl ProviderAdapter for ArbeitnowAdapter {
    fn source_name(&self) -> &str {
        &self.source
    }

    async fn fetch(&self, params: &SearchParams) -> Result<Vec<NormalizedJob>, AppError> {
        let response: BoardResponse = self
            .http
            .get_json(&self.base_url, "/api/job-board-api", &[("page", "1".to_string())])
            .await?;
        let filter = LocalFilter::new(params);

        let jobs: Vec<NormalizedJob> = response
            .data
            .into_iter()
            .filter(|job| {
                let tags = job.tags.join(" ");
                filter.matches_query(&[
                    job.title.as_str(),
                    tags.as_str(),
                    job.company_name.as_str(),
                ])
            })
            .map(|job| self.normalize(job))
            .filter(|job| filter.matches_location(&job.location, job.remote))
            .filter(|job| filter.matches_remote(job.remote))
            .collect();

        tracing::debug!(source = %self.source, results = jobs.len(), "Arbeitnow responded");
        Ok(jobs)
    }
}
