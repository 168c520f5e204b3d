use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::{AggregationResult, NormalizedJob, SearchParams};

/// One external job provider.
///
/// Maps [`SearchParams`] onto the provider's query semantics and the raw
/// response onto [`NormalizedJob`]. Fields that cannot be mapped degrade to
/// `None`/empty; only transport or wholesale parse failures are errors.
/// Object-safe so the aggregator can hold a heterogeneous set.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Name of the registry entry this adapter serves.
    fn source_name(&self) -> &str;

    async fn fetch(&self, params: &SearchParams) -> Result<Vec<NormalizedJob>, AppError>;
}

/// Time-bounded store of full aggregation results keyed by canonical params.
pub trait ResultCache: Send + Sync + Clone + 'static {
    fn get(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<Arc<AggregationResult>>, AppError>> + Send;

    fn put(
        &self,
        key: String,
        result: Arc<AggregationResult>,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    fn invalidate_all(&self);
}

/// Filter for the user-submitted postings query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPostingFilter {
    pub query: Option<String>,
    pub location: Option<String>,
    pub limit: usize,
}

impl UserPostingFilter {
    pub const DEFAULT_LIMIT: usize = 200;

    pub fn from_params(params: &SearchParams) -> Self {
        let params = params.normalized();
        Self {
            query: params.query,
            location: params.location,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

/// Read-only access to locally stored, user-submitted postings.
///
/// Implementations return active rows, newest first.
#[async_trait]
pub trait JobPostingStore: Send + Sync {
    async fn find_user_submitted(
        &self,
        filter: &UserPostingFilter,
    ) -> Result<Vec<NormalizedJob>, AppError>;

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}

/// A no-op JobPostingStore for deployments without a database.
#[derive(Debug, Clone)]
pub struct NullStore;

#[async_trait]
impl JobPostingStore for NullStore {
    async fn find_user_submitted(
        &self,
        _filter: &UserPostingFilter,
    ) -> Result<Vec<NormalizedJob>, AppError> {
        Ok(vec![])
    }
}
