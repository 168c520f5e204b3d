//! Result cache implementations.
//!
//! The cache stores the full merged list for a filter set, never a page, and
//! hands out shared `Arc`s so a stored result is never mutated.

use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::Expiry;
use moka::future::Cache;

use crate::error::AppError;
use crate::models::AggregationResult;
use crate::traits::ResultCache;

#[derive(Clone)]
struct Entry {
    result: Arc<AggregationResult>,
    ttl: Duration,
}

/// Expires each entry after the TTL it was stored with.
struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process cache backed by moka, bounded by entry count.
#[derive(Clone)]
pub struct MokaResultCache {
    cache: Cache<String, Entry>,
}

impl MokaResultCache {
    pub fn new(max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();
        Self { cache }
    }

    /// Approximate entry count (pending maintenance is flushed first).
    pub async fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }
}

impl ResultCache for MokaResultCache {
    async fn get(&self, key: &str) -> Result<Option<Arc<AggregationResult>>, AppError> {
        Ok(self.cache.get(key).await.map(|e| e.result))
    }

    async fn put(
        &self,
        key: String,
        result: Arc<AggregationResult>,
        ttl: Duration,
    ) -> Result<(), AppError> {
        self.cache.insert(key, Entry { result, ttl }).await;
        Ok(())
    }

    fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }
}

/// Cache that never stores anything.
#[derive(Debug, Clone, Default)]
pub struct NoopCache;

impl ResultCache for NoopCache {
    async fn get(&self, _key: &str) -> Result<Option<Arc<AggregationResult>>, AppError> {
        Ok(None)
    }

    async fn put(
        &self,
        _key: String,
        _result: Arc<AggregationResult>,
        _ttl: Duration,
    ) -> Result<(), AppError> {
        Ok(())
    }

    fn invalidate_all(&self) {}
}
