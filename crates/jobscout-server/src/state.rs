use std::sync::Arc;

use jobscout_core::{Aggregator, JobPostingStore, MokaResultCache};

/// Shared application state, available to all route handlers via `State<Arc<AppState>>`.
pub struct AppState {
    pub aggregator: Aggregator<MokaResultCache>,
    /// User-submitted postings; a `NullStore` when no database is configured.
    pub store: Arc<dyn JobPostingStore>,
    /// False when running without `DATABASE_URL`.
    pub has_database: bool,
}
