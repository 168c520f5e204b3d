use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::Utc;
use jobscout_core::error::AppError;
use jobscout_core::models::{NormalizedJob, RemoteLabel, SearchParams, SourceRef};
use jobscout_core::traits::ProviderAdapter;
use jobscout_core::util::{collapse_whitespace, fold};
use serde::Deserialize;

use crate::cleaner::{DescriptionCleaner, strip_tags};
use crate::http::HttpClient;
use crate::normalize::{
    RawId, format_salary, infer_experience, job_type_label, namespaced_id, parse_date,
    remote_label, salary_floor,
};

pub const DEFAULT_BASE_URL: &str = "https://api.adzuna.com";
const RESULTS_PER_PAGE: u32 = 50;
const KM_PER_MILE: f64 = 1.609_344;

#[derive(Debug, Clone)]
pub struct AdzunaCredentials {
    pub app_id: String,
    pub app_key: String,
    /// Two-letter country code used in the endpoint path, e.g. `"us"`.
    pub country: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<AdzunaJob>,
}

#[derive(Debug, Deserialize)]
struct AdzunaJob {
    id: RawId,
    #[serde(default)]
    title: String,
    company: Option<DisplayName>,
    location: Option<DisplayName>,
    #[serde(default)]
    description: String,
    redirect_url: Option<String>,
    created: Option<String>,
    salary_min: Option<f64>,
    salary_max: Option<f64>,
    contract_time: Option<String>,
    contract_type: Option<String>,
    category: Option<Category>,
}

#[derive(Debug, Deserialize)]
struct DisplayName {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Category {
    label: Option<String>,
}

/// Adzuna job search API.
pub struct AdzunaAdapter {
    source: String,
    http: HttpClient,
    cleaner: DescriptionCleaner,
    credentials: AdzunaCredentials,
    base_url: String,
}

impl AdzunaAdapter {
    pub fn new(
        source: impl Into<String>,
        http: HttpClient,
        credentials: AdzunaCredentials,
    ) -> Self {
        Self {
            source: source.into(),
            http,
            cleaner: DescriptionCleaner::new(),
            credentials,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn query(&self, params: &SearchParams) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("app_id", self.credentials.app_id.clone()),
            ("app_key", self.credentials.app_key.clone()),
            ("results_per_page", RESULTS_PER_PAGE.to_string()),
            ("content-type", "application/json".to_string()),
        ];

        let mut what = params.query.clone().unwrap_or_default();
        if params.remote == Some(true) {
            what = format!("{what} remote").trim().to_string();
        }
        if !what.is_empty() {
            query.push(("what", what));
        }
        if let Some(location) = &params.location {
            query.push(("where", location.clone()));
            let km = (f64::from(params.radius) * KM_PER_MILE).round() as u64;
            query.push(("distance", km.to_string()));
        }
        if let Some(flag) = params.job_type.as_deref().and_then(contract_flag) {
            query.push((flag, "1".to_string()));
        }
        if let Some(floor) = params.salary_range.as_deref().and_then(salary_floor) {
            query.push(("salary_min", floor.to_string()));
        }
        query
    }

    fn normalize(&self, job: AdzunaJob) -> NormalizedJob {
        let title = collapse_whitespace(&strip_tags(&job.title));
        let location = job
            .location
            .and_then(|l| l.display_name)
            .unwrap_or_default();
        let job_type = job
            .contract_time
            .or(job.contract_type)
            .map(|t| job_type_label(&t))
            .unwrap_or_else(|| "Not specified".to_string());
        let tags: BTreeSet<String> = job
            .category
            .and_then(|c| c.label)
            .map(|l| fold(&l))
            .into_iter()
            .collect();

        NormalizedJob {
            id: namespaced_id("adzuna", &job.id),
            remote: remote_label(None, &[title.as_str(), location.as_str()]),
            experience: infer_experience(&title),
            company: job
                .company
                .and_then(|c| c.display_name)
                .unwrap_or_else(|| "Unknown company".to_string()),
            salary: format_salary(
                job.salary_min,
                job.salary_max,
                currency_symbol(&self.credentials.country),
            ),
            job_type,
            description: self.cleaner.description(&job.description),
            tags,
            source: SourceRef {
                name: self.source.clone(),
                api: "adzuna".to_string(),
                priority: 0,
            },
            source_url: job.redirect_url,
            date_posted: parse_date(job.created.as_deref(), Utc::now()),
            logo: None,
            is_ai_recommended: false,
            title,
            location,
        }
    }
}

#[async_trait]
impl ProviderAdapter for AdzunaAdapter {
    fn source_name(&self) -> &str {
        &self.source
    }

    async fn fetch(&self, params: &SearchParams) -> Result<Vec<NormalizedJob>, AppError> {
        let path = format!("/v1/api/jobs/{}/search/1", self.credentials.country);
        let response: SearchResponse = self
            .http
            .get_json(&self.base_url, &path, &self.query(params))
            .await?;

        tracing::debug!(
            source = %self.source,
            results = response.results.len(),
            "Adzuna responded"
        );
        Ok(response
            .results
            .into_iter()
            .map(|job| self.normalize(job))
            .filter(|job| params.remote != Some(true) || job.remote != RemoteLabel::OnSite)
            .collect())
    }
}

fn contract_flag(job_type: &str) -> Option<&'static str> {
    match job_type_label(job_type).as_str() {
        "Full-time" => Some("full_time"),
        "Part-time" => Some("part_time"),
        "Contract" => Some("contract"),
        _ => None,
    }
}

fn currency_symbol(country: &str) -> &'static str {
    match country.to_ascii_lowercase().as_str() {
        "gb" => "£",
        "us" | "ca" | "au" | "nz" | "sg" => "$",
        "in" => "₹",
        "br" => "R$",
        "pl" => "zł",
        _ => "€",
    }
}
