pub mod aggregator;
pub mod cache;
pub mod circuit_breaker;
pub mod config;
pub mod error;
pub mod merge;
pub mod models;
pub mod pagination;
pub mod rate_limit;
pub mod registry;
pub mod traits;
pub mod util;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use aggregator::{Aggregator, AggregatorBuilder};
pub use cache::{MokaResultCache, NoopCache};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use config::AggregatorConfig;
pub use error::{AppError, ProviderError};
pub use models::{
    AggregationResult, JobSource, NormalizedJob, RemoteLabel, SearchParams, SourceRef,
    SourceReport, SourceStatus, compute_hash,
};
pub use pagination::{Page, paginate, with_user_submitted};
pub use rate_limit::RateLimiter;
pub use registry::SourceRegistry;
pub use traits::{JobPostingStore, NullStore, ProviderAdapter, ResultCache, UserPostingFilter};
