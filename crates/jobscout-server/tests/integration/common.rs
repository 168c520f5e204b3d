use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use http_body_util::BodyExt;
use tower::ServiceExt;

use jobscout_core::models::JobSource;
use jobscout_core::testutil::{MockAdapter, MockJobStore};
use jobscout_core::{
    Aggregator, AggregatorConfig, JobPostingStore, MokaResultCache, NullStore, ProviderAdapter,
    SourceRegistry,
};
use jobscout_server::routes;
use jobscout_server::state::AppState;

/// A router wired to mock providers and a mock (or absent) store.
pub struct TestApp {
    pub router: Router,
}

pub fn test_app(
    sources: Vec<JobSource>,
    adapters: &[MockAdapter],
    store: Option<MockJobStore>,
) -> TestApp {
    let registry = Arc::new(SourceRegistry::new(sources).expect("valid registry"));
    let aggregator = Aggregator::builder(registry, MokaResultCache::new(100))
        .adapters(
            adapters
                .iter()
                .map(|a| Arc::new(a.clone()) as Arc<dyn ProviderAdapter>),
        )
        .config(AggregatorConfig {
            provider_timeout: Duration::from_millis(500),
            aggregation_timeout: Duration::from_millis(800),
            ..Default::default()
        })
        .build();

    let (store, has_database): (Arc<dyn JobPostingStore>, bool) = match store {
        Some(store) => (Arc::new(store), true),
        None => (Arc::new(NullStore), false),
    };

    let state = Arc::new(AppState {
        aggregator,
        store,
        has_database,
    });

    TestApp {
        router: routes::router(state),
    }
}

/// Send a GET and return the status plus the decoded JSON body.
pub async fn get_json(router: &Router, uri: &str) -> (axum::http::StatusCode, serde_json::Value) {
    let response: Response<Body> = router
        .clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}
