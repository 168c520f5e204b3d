use std::sync::Arc;

use axum::Router;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use jobscout_core::AppError;
use jobscout_core::pagination::{paginate, with_user_submitted};
use jobscout_core::traits::UserPostingFilter;

use crate::dto::{
    HealthResponse, SearchQuery, SearchResponse, SourceListResponse, SourceResponse,
};
use crate::error::ApiError;
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Build the full router with all routes.
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/v1/jobs/search", get(search_jobs))
        .route("/v1/sources", get(list_sources));

    let public = Router::new()
        .route("/health", get(health))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    public.merge(api).with_state(state)
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/v1/jobs/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "One page of aggregated jobs", body = SearchResponse),
        (status = 400, description = "Invalid search parameters", body = crate::dto::ErrorResponse),
    ),
    tag = "jobs"
)]
pub async fn search_jobs(
    State(state): State<Arc<AppState>>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query.map_err(|e| AppError::InvalidParams(e.body_text()))?;
    let params = query.into_params();
    params.validate()?;

    let result = state.aggregator.aggregate_jobs(&params).await;

    // The store only ever adds postings; a failing store degrades to none.
    let filter = UserPostingFilter::from_params(&params);
    let user_jobs = match state.store.find_user_submitted(&filter).await {
        Ok(jobs) => jobs,
        Err(e) => {
            tracing::warn!(error = %e, "User-submitted postings unavailable");
            Vec::new()
        }
    };

    let result = with_user_submitted(result, user_jobs);
    let page = paginate(&result.jobs, params.page, params.limit);

    Ok(axum::Json(SearchResponse::new(&result, &page)))
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/v1/sources",
    responses(
        (status = 200, description = "Configured job sources", body = SourceListResponse),
    ),
    tag = "sources"
)]
pub async fn list_sources(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let aggregator = &state.aggregator;
    let sources = aggregator
        .registry()
        .all()
        .iter()
        .map(|s| SourceResponse {
            name: s.name.clone(),
            api: s.api.clone(),
            priority: s.priority,
            enabled: s.enabled,
            rate_limit: s.rate_limit,
            rate_window_secs: s.rate_window_secs,
            remaining: aggregator.rate_limiter().remaining(&s.name),
            available: aggregator.has_adapter(&s.name),
            circuit: aggregator
                .circuit_stats(&s.name)
                .map(|stats| stats.state.to_string()),
        })
        .collect();

    axum::Json(SourceListResponse { sources })
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Service is unhealthy", body = HealthResponse),
    ),
    tag = "system"
)]
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let db_status = if !state.has_database {
        "disabled"
    } else {
        match state.store.health_check().await {
            Ok(()) => "ok",
            Err(e) => {
                tracing::warn!(error = %e, "Database health check failed");
                "error"
            }
        }
    };

    let (status, label) = if db_status == "error" {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    } else {
        (StatusCode::OK, "healthy")
    };

    let response = HealthResponse {
        status: label,
        database: db_status,
    };

    (status, axum::Json(response))
}
