use axum::http::StatusCode;

use jobscout_core::error::AppError;
use jobscout_core::models::JobSource;
use jobscout_core::testutil::{MockAdapter, MockJobStore, days_ago, make_job};

use crate::integration::common::{get_json, test_app};

fn two_sources() -> Vec<JobSource> {
    vec![
        JobSource::new("Alpha", "alpha", 1).with_rate_limit(10, 60),
        JobSource::new("Beta", "beta", 2),
    ]
}

fn alpha_jobs(count: usize) -> Vec<jobscout_core::NormalizedJob> {
    (0..count)
        .map(|i| {
            let mut job = make_job(
                &format!("a{i}"),
                &format!("Engineer {i}"),
                "Acme",
                "Berlin",
                "Alpha",
                1,
            );
            job.date_posted = days_ago(i as i64);
            job
        })
        .collect()
}

#[tokio::test]
async fn health_without_database_is_healthy() {
    let app = test_app(two_sources(), &[], None);

    let (status, json) = get_json(&app.router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["database"], "disabled");
}

#[tokio::test]
async fn health_reports_failing_database() {
    let store = MockJobStore::with_error(AppError::DatabaseError("down".into()));
    let app = test_app(two_sources(), &[], Some(store));

    let (status, json) = get_json(&app.router, "/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["database"], "error");
}

#[tokio::test]
async fn search_paginates_merged_results() {
    let alpha = MockAdapter::new("Alpha", alpha_jobs(5));
    let beta = MockAdapter::new(
        "Beta",
        vec![make_job("b1", "Designer", "Pixel", "Paris", "Beta", 2)],
    );
    let app = test_app(two_sources(), &[alpha, beta], None);

    let (status, json) = get_json(&app.router, "/v1/jobs/search?limit=2&page=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 6);
    assert_eq!(json["page"], 2);
    assert_eq!(json["limit"], 2);
    assert_eq!(json["total_pages"], 3);
    assert_eq!(json["has_more"], true);
    assert_eq!(json["jobs"].as_array().unwrap().len(), 2);
    assert_eq!(json["sources"], serde_json::json!(["Alpha", "Beta"]));
    assert_eq!(json["cache_hit"], false);
    assert_eq!(json["diagnostics"][0]["status"], "ok");
}

#[tokio::test]
async fn second_page_is_served_from_cache() {
    let alpha = MockAdapter::new("Alpha", alpha_jobs(3));
    let app = test_app(two_sources(), &[alpha.clone()], None);

    get_json(&app.router, "/v1/jobs/search?q=engineer&page=1&limit=2").await;
    let (_, json) = get_json(&app.router, "/v1/jobs/search?q=engineer&page=2&limit=2").await;

    assert_eq!(json["cache_hit"], true);
    assert_eq!(json["jobs"].as_array().unwrap().len(), 1);
    assert_eq!(alpha.call_count(), 1);
}

#[tokio::test]
async fn user_postings_are_appended_after_provider_jobs() {
    let alpha = MockAdapter::new("Alpha", alpha_jobs(1));
    let user = make_job("user-1", "Barista", "Cafe", "Berlin", "User Submitted", 0);
    let store = MockJobStore::with_jobs(vec![user]);
    let app = test_app(two_sources(), &[alpha], Some(store.clone()));

    let (status, json) = get_json(&app.router, "/v1/jobs/search?q=coffee&location=Berlin").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 2);
    assert_eq!(json["jobs"][1]["id"], "user-1");
    assert_eq!(json["jobs"][1]["source"], "User Submitted");
    assert_eq!(json["sources"], serde_json::json!(["Alpha", "User Submitted"]));

    let filters = store.filters.lock().unwrap();
    assert_eq!(filters[0].query.as_deref(), Some("coffee"));
    assert_eq!(filters[0].location.as_deref(), Some("Berlin"));
}

#[tokio::test]
async fn failing_store_still_serves_provider_results() {
    let alpha = MockAdapter::new("Alpha", alpha_jobs(2));
    let store = MockJobStore::with_error(AppError::DatabaseError("timeout".into()));
    let app = test_app(two_sources(), &[alpha], Some(store));

    let (status, json) = get_json(&app.router, "/v1/jobs/search").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 2);
    assert_eq!(json["sources"], serde_json::json!(["Alpha"]));
}

#[tokio::test]
async fn failing_provider_is_reported_not_fatal() {
    let alpha = MockAdapter::with_error("Alpha", AppError::NetworkError("reset".into()));
    let beta = MockAdapter::new(
        "Beta",
        vec![make_job("b1", "Designer", "Pixel", "Paris", "Beta", 2)],
    );
    let app = test_app(two_sources(), &[alpha, beta], None);

    let (status, json) = get_json(&app.router, "/v1/jobs/search").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["sources"], serde_json::json!(["Beta"]));
    assert_eq!(json["diagnostics"][0]["source"], "Alpha");
    assert_eq!(json["diagnostics"][0]["status"], "failed");
}

#[tokio::test]
async fn invalid_params_return_400() {
    let app = test_app(two_sources(), &[], None);

    for uri in [
        "/v1/jobs/search?limit=500",
        "/v1/jobs/search?page=0",
        "/v1/jobs/search?radius=lots",
        "/v1/jobs/search?remote=maybe",
    ] {
        let (status, json) = get_json(&app.router, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(json["error"], "invalid_params", "{uri}");
    }
}

#[tokio::test]
async fn out_of_range_page_is_empty() {
    let alpha = MockAdapter::new("Alpha", alpha_jobs(3));
    let app = test_app(two_sources(), &[alpha], None);

    let (status, json) = get_json(&app.router, "/v1/jobs/search?page=9").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 3);
    assert!(json["jobs"].as_array().unwrap().is_empty());
    assert_eq!(json["has_more"], false);
}

#[tokio::test]
async fn sources_lists_registry_with_budget() {
    let alpha = MockAdapter::new("Alpha", alpha_jobs(1));
    let app = test_app(two_sources(), &[alpha], None);

    get_json(&app.router, "/v1/jobs/search").await;
    let (status, json) = get_json(&app.router, "/v1/sources").await;
    assert_eq!(status, StatusCode::OK);

    let sources = json["sources"].as_array().unwrap();
    assert_eq!(sources.len(), 2);
    assert_eq!(sources[0]["name"], "Alpha");
    assert_eq!(sources[0]["remaining"], 9);
    assert_eq!(sources[0]["available"], true);
    assert_eq!(sources[0]["circuit"], "closed");
    assert_eq!(sources[1]["available"], false);
    assert!(sources[1]["remaining"].is_null());
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = test_app(two_sources(), &[], None);
    let (status, json) = get_json(&app.router, "/api-docs/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["paths"]["/v1/jobs/search"].is_object());
}
