//! The aggregation engine.
//!
//! Per call:
//!
//! ```text
//! CACHE_LOOKUP --hit--> RETURN
//!      |
//!     miss --> DISPATCH --> COLLECT --> MERGE/DEDUPE/SORT --> CACHE_STORE --> RETURN
//! ```
//!
//! Dispatch spawns one task per authorized source; collection waits for all
//! of them or the global deadline, whichever comes first. A failing source
//! only removes itself from the result.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerStats};
use crate::config::AggregatorConfig;
use crate::error::{AppError, ProviderError};
use crate::merge;
use crate::models::{
    AggregationResult, JobSource, NormalizedJob, SearchParams, SourceReport, SourceStatus,
};
use crate::rate_limit::RateLimiter;
use crate::registry::SourceRegistry;
use crate::traits::{ProviderAdapter, ResultCache};

type FetchOutcome = (Result<Vec<NormalizedJob>, AppError>, u64);

struct Inner<C> {
    registry: Arc<SourceRegistry>,
    adapters: HashMap<String, Arc<dyn ProviderAdapter>>,
    limiter: RateLimiter,
    breakers: HashMap<String, CircuitBreaker>,
    cache: C,
    config: AggregatorConfig,
}

/// Fans a search out to every enabled provider and merges the answers.
///
/// Cheap to clone; clones share the cache, budgets and breakers.
pub struct Aggregator<C: ResultCache> {
    inner: Arc<Inner<C>>,
}

impl<C: ResultCache> Clone for Aggregator<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Builder for [`Aggregator`].
pub struct AggregatorBuilder<C: ResultCache> {
    registry: Arc<SourceRegistry>,
    cache: C,
    adapters: Vec<Arc<dyn ProviderAdapter>>,
    config: AggregatorConfig,
    limiter: Option<RateLimiter>,
}

impl<C: ResultCache> AggregatorBuilder<C> {
    pub fn adapter(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.adapters.push(adapter);
        self
    }

    pub fn adapters(
        mut self,
        adapters: impl IntoIterator<Item = Arc<dyn ProviderAdapter>>,
    ) -> Self {
        self.adapters.extend(adapters);
        self
    }

    pub fn config(mut self, config: AggregatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the limiter derived from the registry.
    pub fn rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn build(self) -> Aggregator<C> {
        let mut adapters = HashMap::new();
        for adapter in self.adapters {
            let name = adapter.source_name().to_string();
            if self.registry.get(&name).is_none() {
                tracing::warn!(source = %name, "Adapter has no registry entry, ignoring");
                continue;
            }
            adapters.insert(name, adapter);
        }

        let breakers = match &self.config.circuit_breaker {
            Some(cb) => self
                .registry
                .all()
                .iter()
                .map(|s| (s.name.clone(), CircuitBreaker::new(s.name.clone(), cb.clone())))
                .collect(),
            None => HashMap::new(),
        };

        let limiter = self
            .limiter
            .unwrap_or_else(|| RateLimiter::new(&self.registry));

        Aggregator {
            inner: Arc::new(Inner {
                registry: self.registry,
                adapters,
                limiter,
                breakers,
                cache: self.cache,
                config: self.config,
            }),
        }
    }
}

impl<C: ResultCache> Aggregator<C> {
    pub fn builder(registry: Arc<SourceRegistry>, cache: C) -> AggregatorBuilder<C> {
        AggregatorBuilder {
            registry,
            cache,
            adapters: Vec::new(),
            config: AggregatorConfig::default(),
            limiter: None,
        }
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.inner.registry
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.inner.limiter
    }

    pub fn cache(&self) -> &C {
        &self.inner.cache
    }

    pub fn has_adapter(&self, source: &str) -> bool {
        self.inner.adapters.contains_key(source)
    }

    pub fn circuit_stats(&self, source: &str) -> Option<CircuitBreakerStats> {
        self.inner.breakers.get(source).map(CircuitBreaker::stats)
    }

    /// Run one aggregation.
    ///
    /// Never fails: provider errors shrink the result, a broken cache behaves
    /// as a cold one, and having no enabled source yields an empty result.
    /// The fan-out runs in its own task, so if this future is dropped the
    /// providers still finish and the result still lands in the cache.
    pub async fn aggregate_jobs(&self, params: &SearchParams) -> AggregationResult {
        let started = Instant::now();
        let params = params.normalized();
        let key = params.cache_key();

        match self.inner.cache.get(&key).await {
            Ok(Some(hit)) => {
                let mut result = (*hit).clone();
                result.cache_hit = true;
                result.execution_time_ms = elapsed_ms(started);
                tracing::debug!(%key, total = result.total, "Cache hit");
                return result;
            }
            Ok(None) => tracing::debug!(%key, "Cache miss"),
            Err(e) => tracing::warn!(error = %e, "Result cache unavailable, treating as miss"),
        }

        if self.inner.registry.enabled().next().is_none() {
            tracing::warn!("No job sources enabled");
            return AggregationResult {
                execution_time_ms: elapsed_ms(started),
                ..AggregationResult::empty()
            };
        }

        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move { inner.run(params, key).await });

        match task.await {
            Ok(mut result) => {
                result.execution_time_ms = elapsed_ms(started);
                result
            }
            Err(e) => {
                tracing::error!(error = %e, "Aggregation task failed");
                AggregationResult {
                    execution_time_ms: elapsed_ms(started),
                    ..AggregationResult::empty()
                }
            }
        }
    }

    /// Like [`aggregate_jobs`](Self::aggregate_jobs) but gives up waiting
    /// when `cancel` fires, returning `None`. In-flight provider calls keep
    /// running and still warm the cache.
    pub async fn aggregate_jobs_cancellable(
        &self,
        params: &SearchParams,
        cancel: &CancellationToken,
    ) -> Option<AggregationResult> {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Aggregation cancelled by caller");
                None
            }
            result = self.aggregate_jobs(params) => Some(result),
        }
    }
}

impl<C: ResultCache> Inner<C> {
    async fn run(&self, params: SearchParams, key: String) -> AggregationResult {
        let started = Instant::now();
        let deadline = tokio::time::Instant::now() + self.config.aggregation_timeout;
        let params = Arc::new(params);

        // DISPATCH
        let mut reports: Vec<(usize, SourceReport)> = Vec::new();
        let mut dispatched: Vec<(usize, JobSource, JoinHandle<FetchOutcome>)> = Vec::new();

        for (order, source) in self.registry.enabled().enumerate() {
            let skip = |status| {
                (
                    order,
                    SourceReport {
                        source: source.name.clone(),
                        status,
                        elapsed_ms: 0,
                    },
                )
            };

            let Some(adapter) = self.adapters.get(&source.name) else {
                tracing::debug!(source = %source.name, "No adapter registered");
                reports.push(skip(SourceStatus::Unavailable));
                continue;
            };

            let breaker = self.breakers.get(&source.name).cloned();
            if breaker.as_ref().is_some_and(|b| !b.allows_request()) {
                tracing::debug!(source = %source.name, "Circuit open, skipping source");
                reports.push(skip(SourceStatus::CircuitOpen));
                continue;
            }

            if !self.limiter.authorize(&source.name) {
                reports.push(skip(SourceStatus::RateLimited));
                continue;
            }

            let handle = spawn_fetch(
                Arc::clone(adapter),
                Arc::clone(&params),
                self.config.provider_timeout,
                breaker,
            );
            dispatched.push((order, source.clone(), handle));
        }

        // COLLECT
        let mut collected: Vec<NormalizedJob> = Vec::new();
        let mut any_success = false;

        for (order, source, handle) in dispatched {
            let (status, elapsed) = match tokio::time::timeout_at(deadline, handle).await {
                Ok(Ok((Ok(jobs), elapsed))) => {
                    any_success = true;
                    let count = jobs.len();
                    let source_ref = source.to_ref();
                    collected.extend(jobs.into_iter().map(|mut job| {
                        job.source = source_ref.clone();
                        job.tidy()
                    }));
                    tracing::debug!(
                        source = %source.name,
                        jobs = count,
                        elapsed_ms = elapsed,
                        "Source responded"
                    );
                    (SourceStatus::Ok { jobs: count }, elapsed)
                }
                Ok(Ok((Err(AppError::Timeout(ms)), elapsed))) => {
                    tracing::warn!(source = %source.name, timeout_ms = ms, "Source timed out");
                    (SourceStatus::TimedOut, elapsed)
                }
                Ok(Ok((Err(e), elapsed))) => {
                    let err = ProviderError::new(&source.name, e);
                    tracing::warn!(error = %err, "Source failed");
                    (
                        SourceStatus::Failed {
                            error: err.error.to_string(),
                        },
                        elapsed,
                    )
                }
                Ok(Err(join_err)) => {
                    tracing::warn!(
                        source = %source.name,
                        error = %join_err,
                        "Adapter task aborted"
                    );
                    (
                        SourceStatus::Failed {
                            error: "adapter task aborted".to_string(),
                        },
                        elapsed_ms(started),
                    )
                }
                Err(_) => {
                    tracing::warn!(
                        source = %source.name,
                        "Aggregation deadline reached before source settled"
                    );
                    (SourceStatus::TimedOut, elapsed_ms(started))
                }
            };
            reports.push((
                order,
                SourceReport {
                    source: source.name.clone(),
                    status,
                    elapsed_ms: elapsed,
                },
            ));
        }
        reports.sort_by_key(|(order, _)| *order);

        // MERGE -> DEDUPE -> SORT
        let jobs = merge::merge(collected, &params);
        let sources: Vec<String> = self
            .registry
            .enabled()
            .filter(|s| jobs.iter().any(|j| j.source.name == s.name))
            .map(|s| s.name.clone())
            .collect();

        let result = AggregationResult {
            total: jobs.len(),
            jobs,
            sources,
            cache_hit: false,
            execution_time_ms: elapsed_ms(started),
            diagnostics: reports.into_iter().map(|(_, r)| r).collect(),
        };

        tracing::info!(
            total = result.total,
            sources = ?result.sources,
            elapsed_ms = result.execution_time_ms,
            "Aggregation complete"
        );

        // CACHE_STORE
        if any_success {
            if let Err(e) = self
                .cache
                .put(key, Arc::new(result.clone()), self.config.cache_ttl)
                .await
            {
                tracing::warn!(error = %e, "Failed to store aggregation result");
            }
        } else {
            tracing::debug!("No source succeeded, result not cached");
        }

        result
    }
}

/// Run one adapter in its own task under the per-provider timeout and feed
/// the outcome to its circuit breaker.
fn spawn_fetch(
    adapter: Arc<dyn ProviderAdapter>,
    params: Arc<SearchParams>,
    timeout: Duration,
    breaker: Option<CircuitBreaker>,
) -> JoinHandle<FetchOutcome> {
    tokio::spawn(async move {
        let started = Instant::now();
        let outcome = match tokio::time::timeout(timeout, adapter.fetch(&params)).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout(timeout.as_millis() as u64)),
        };
        if let Some(breaker) = breaker {
            match &outcome {
                Ok(_) => breaker.record_success(),
                Err(e) => breaker.record_failure(e),
            }
        }
        (outcome, elapsed_ms(started))
    })
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}
