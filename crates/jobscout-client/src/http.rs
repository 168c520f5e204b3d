use std::time::Duration;

use jobscout_core::error::AppError;
use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

pub const USER_AGENT: &str = "Jobscout/0.1 (job search aggregator)";

/// Longest upstream error body kept in an [`AppError::HttpError`].
const MAX_ERROR_BODY: usize = 200;

/// Shared JSON-over-HTTP client for provider adapters.
///
/// Wraps one reqwest connection pool with a fixed User-Agent and a request
/// timeout. Clones share the pool.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    timeout: Duration,
}

impl HttpClient {
    pub fn new() -> Result<Self, AppError> {
        Self::with_timeout(Duration::from_secs(10))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, timeout })
    }

    /// GET `base` + `path` with `query` appended and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        base: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, AppError> {
        let url = build_url(base, path, query)?;

        let response = self
            .client
            .get(url.as_str())
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Timeout(self.timeout.as_millis() as u64)
                } else if e.is_connect() {
                    AppError::NetworkError(format!("Connection failed: {e}"))
                } else {
                    AppError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let mut message: String = body.chars().take(MAX_ERROR_BODY).collect();
            if message.trim().is_empty() {
                message = status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string();
            }
            return Err(AppError::HttpError {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(self.timeout.as_millis() as u64)
            } else {
                AppError::NetworkError(format!("Failed to read response body: {e}"))
            }
        })?;

        serde_json::from_slice(&bytes)
            .map_err(|e| AppError::ParseError(format!("Unexpected response from {path}: {e}")))
    }
}

fn build_url(base: &str, path: &str, query: &[(&str, String)]) -> Result<Url, AppError> {
    let joined = format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'));
    let mut url = Url::parse(&joined)
        .map_err(|e| AppError::ConfigError(format!("Invalid provider URL '{joined}': {e}")))?;
    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query {
            pairs.append_pair(key, value);
        }
    }
    Ok(url)
}
