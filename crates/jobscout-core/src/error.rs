use thiserror::Error;

/// Application-wide error types for Jobscout.
#[derive(Error, Debug, Clone)]
pub enum AppError {
    /// Provider answered with a non-success HTTP status.
    #[error("HTTP {status}: {message}")]
    HttpError { status: u16, message: String },

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timed out.
    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    /// Provider response could not be parsed into job records.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Result cache unavailable.
    #[error("Cache error: {0}")]
    CacheError(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Search parameters rejected by validation.
    #[error("Invalid search parameters: {0}")]
    InvalidParams(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::SerializationError(err.to_string())
    }
}

impl AppError {
    /// Returns true if this error should trip a provider's circuit breaker.
    pub fn should_trip_circuit(&self) -> bool {
        match self {
            AppError::NetworkError(_) | AppError::Timeout(_) => true,
            // Trip on rate limits (429) and server errors (5xx)
            AppError::HttpError { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Returns true if the upstream told us to slow down.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, AppError::HttpError { status: 429, .. })
    }
}

/// A single provider's failure during one aggregation call.
///
/// Logged and reported in diagnostics, never propagated to the caller.
#[derive(Error, Debug, Clone)]
#[error("provider '{provider}' failed: {error}")]
pub struct ProviderError {
    pub provider: String,
    pub error: AppError,
}

impl ProviderError {
    pub fn new(provider: impl Into<String>, error: AppError) -> Self {
        Self {
            provider: provider.into(),
            error,
        }
    }
}
