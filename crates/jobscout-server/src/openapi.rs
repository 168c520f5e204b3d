use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Jobscout API",
        version = "0.1.0",
        description = "Job search aggregated across external job boards and user-submitted postings."
    ),
    paths(
        crate::routes::search_jobs,
        crate::routes::list_sources,
        crate::routes::health,
    ),
    components(schemas(
        crate::dto::JobResponse,
        crate::dto::SourceReportResponse,
        crate::dto::SearchResponse,
        crate::dto::SourceResponse,
        crate::dto::SourceListResponse,
        crate::dto::HealthResponse,
        crate::dto::ErrorResponse,
    )),
    tags(
        (name = "jobs", description = "Aggregated job search"),
        (name = "sources", description = "Configured job sources"),
        (name = "system", description = "Health and system status"),
    )
)]
pub struct ApiDoc;
