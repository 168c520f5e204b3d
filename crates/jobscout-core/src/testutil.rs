//! Test utilities: mock implementations of the core traits.
//!
//! Handwritten mocks for dependency injection in unit and route tests.
//! All mocks use `Arc<Mutex<_>>` or atomics for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};

use crate::error::AppError;
use crate::models::{AggregationResult, NormalizedJob, RemoteLabel, SearchParams, SourceRef};
use crate::traits::{JobPostingStore, ProviderAdapter, ResultCache, UserPostingFilter};

// ---------------------------------------------------------------------------
// MockAdapter
// ---------------------------------------------------------------------------

type Response = Result<Vec<NormalizedJob>, AppError>;

/// Mock provider adapter with a response queue and a call counter.
#[derive(Clone)]
pub struct MockAdapter {
    name: String,
    /// Each call pops the first element; once empty, `fallback` is returned.
    responses: Arc<Mutex<Vec<Response>>>,
    fallback: Response,
    delay: Duration,
    panics: bool,
    calls: Arc<AtomicUsize>,
    seen_params: Arc<Mutex<Vec<SearchParams>>>,
}

impl MockAdapter {
    /// Adapter that returns `jobs` on every call.
    pub fn new(name: &str, jobs: Vec<NormalizedJob>) -> Self {
        Self {
            name: name.to_string(),
            responses: Arc::new(Mutex::new(Vec::new())),
            fallback: Ok(jobs),
            delay: Duration::ZERO,
            panics: false,
            calls: Arc::new(AtomicUsize::new(0)),
            seen_params: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Adapter that fails with `error` on every call.
    pub fn with_error(name: &str, error: AppError) -> Self {
        Self {
            fallback: Err(error),
            ..Self::new(name, vec![])
        }
    }

    /// Adapter that panics inside `fetch`.
    pub fn panicking(name: &str) -> Self {
        Self {
            panics: true,
            ..Self::new(name, vec![])
        }
    }

    /// Queue one-off responses served before the fallback.
    pub fn with_responses(self, responses: Vec<Response>) -> Self {
        *self.responses.lock().unwrap() = responses;
        self
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen_params(&self) -> Vec<SearchParams> {
        self.seen_params.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProviderAdapter for MockAdapter {
    fn source_name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, params: &SearchParams) -> Result<Vec<NormalizedJob>, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_params.lock().unwrap().push(params.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.panics {
            panic!("mock adapter '{}' panicked", self.name);
        }
        let queued = {
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                None
            } else {
                Some(responses.remove(0))
            }
        };
        queued.unwrap_or_else(|| self.fallback.clone())
    }
}

// ---------------------------------------------------------------------------
// MockJobStore
// ---------------------------------------------------------------------------

/// Mock store that records filters and returns configurable postings.
#[derive(Clone, Default)]
pub struct MockJobStore {
    jobs: Arc<Mutex<Vec<NormalizedJob>>>,
    error: Arc<Mutex<Option<AppError>>>,
    pub filters: Arc<Mutex<Vec<UserPostingFilter>>>,
}

impl MockJobStore {
    pub fn with_jobs(jobs: Vec<NormalizedJob>) -> Self {
        Self {
            jobs: Arc::new(Mutex::new(jobs)),
            ..Self::default()
        }
    }

    pub fn with_error(error: AppError) -> Self {
        Self {
            error: Arc::new(Mutex::new(Some(error))),
            ..Self::default()
        }
    }
}

#[async_trait]
impl JobPostingStore for MockJobStore {
    async fn find_user_submitted(
        &self,
        filter: &UserPostingFilter,
    ) -> Result<Vec<NormalizedJob>, AppError> {
        self.filters.lock().unwrap().push(filter.clone());
        if let Some(e) = self.error.lock().unwrap().clone() {
            return Err(e);
        }
        Ok(self.jobs.lock().unwrap().clone())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        match self.error.lock().unwrap().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// FailingCache
// ---------------------------------------------------------------------------

/// Cache whose every operation fails, for cold-cache degrade tests.
#[derive(Clone, Default)]
pub struct FailingCache {
    pub attempts: Arc<AtomicUsize>,
}

impl ResultCache for FailingCache {
    async fn get(&self, _key: &str) -> Result<Option<Arc<AggregationResult>>, AppError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(AppError::CacheError("cache offline".into()))
    }

    async fn put(
        &self,
        _key: String,
        _result: Arc<AggregationResult>,
        _ttl: Duration,
    ) -> Result<(), AppError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(AppError::CacheError("cache offline".into()))
    }

    fn invalidate_all(&self) {}
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// Fixed reference instant so date-based ordering in tests is stable.
pub fn reference_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0)
        .single()
        .unwrap_or_default()
}

pub fn days_ago(days: i64) -> DateTime<Utc> {
    reference_time() - TimeDelta::days(days)
}

/// Create a job posted at [`reference_time`].
pub fn make_job(
    id: &str,
    title: &str,
    company: &str,
    location: &str,
    source: &str,
    priority: i32,
) -> NormalizedJob {
    NormalizedJob {
        id: id.to_string(),
        title: title.to_string(),
        company: company.to_string(),
        location: location.to_string(),
        salary: None,
        job_type: "Full-time".to_string(),
        experience: "Mid Level".to_string(),
        description: format!("{title} at {company}"),
        tags: BTreeSet::new(),
        source: SourceRef {
            name: source.to_string(),
            api: source.to_lowercase(),
            priority,
        },
        source_url: None,
        remote: RemoteLabel::OnSite,
        date_posted: reference_time(),
        logo: None,
        is_ai_recommended: false,
    }
}
