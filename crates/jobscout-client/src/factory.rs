use std::sync::Arc;

use jobscout_core::registry::SourceRegistry;
use jobscout_core::traits::ProviderAdapter;

use crate::adzuna::{AdzunaAdapter, AdzunaCredentials};
use crate::arbeitnow::ArbeitnowAdapter;
use crate::http::HttpClient;
use crate::remoteok::RemoteOkAdapter;

/// API credentials for providers that need them.
#[derive(Debug, Clone, Default)]
pub struct ProviderCredentials {
    pub adzuna: Option<AdzunaCredentials>,
}

impl ProviderCredentials {
    /// `ADZUNA_APP_ID`, `ADZUNA_APP_KEY` and optionally `ADZUNA_COUNTRY`
    /// (default `us`).
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let adzuna = match (non_blank("ADZUNA_APP_ID"), non_blank("ADZUNA_APP_KEY")) {
            (Some(app_id), Some(app_key)) => Some(AdzunaCredentials {
                app_id,
                app_key,
                country: non_blank("ADZUNA_COUNTRY")
                    .map(|c| c.trim().to_ascii_lowercase())
                    .unwrap_or_else(|| "us".to_string()),
            }),
            _ => None,
        };
        Self { adzuna }
    }
}

/// Build one adapter per registry entry whose `api` identifier is known.
///
/// Entries with unknown identifiers, or whose provider needs missing
/// credentials, are logged and skipped; the aggregator reports those
/// sources as unavailable.
pub fn build_adapters(
    registry: &SourceRegistry,
    credentials: &ProviderCredentials,
    http: &HttpClient,
) -> Vec<Arc<dyn ProviderAdapter>> {
    let mut adapters: Vec<Arc<dyn ProviderAdapter>> = Vec::new();

    for source in registry.all() {
        match source.api.as_str() {
            "adzuna" => match &credentials.adzuna {
                Some(creds) => adapters.push(Arc::new(AdzunaAdapter::new(
                    source.name.clone(),
                    http.clone(),
                    creds.clone(),
                ))),
                None => tracing::warn!(
                    source = %source.name,
                    "ADZUNA_APP_ID/ADZUNA_APP_KEY not set, source unavailable"
                ),
            },
            "remoteok" => adapters.push(Arc::new(RemoteOkAdapter::new(
                source.name.clone(),
                http.clone(),
            ))),
            "arbeitnow" => adapters.push(Arc::new(ArbeitnowAdapter::new(
                source.name.clone(),
                http.clone(),
            ))),
            other => tracing::warn!(source = %source.name, api = %other, "Unknown provider API"),
        }
    }

    tracing::info!(adapters = adapters.len(), sources = registry.len(), "Provider adapters ready");
    adapters
}
