use std::sync::Arc;

use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use jobscout_client::{HttpClient, ProviderCredentials, build_adapters};
use jobscout_core::config::load_registry;
use jobscout_core::{Aggregator, AggregatorConfig, JobPostingStore, MokaResultCache, NullStore};
use jobscout_db::{Database, DatabaseConfig};
use jobscout_server::routes;
use jobscout_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("jobscout=info".parse()?))
        .with_target(false)
        .init();

    let port = std::env::var("JOBSCOUT_SERVER_PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("0.0.0.0:{port}");

    let config = AggregatorConfig::from_env()?;
    let registry = Arc::new(load_registry()?);
    let http = HttpClient::with_timeout(config.provider_timeout)?;
    let adapters = build_adapters(&registry, &ProviderCredentials::from_env(), &http);

    let aggregator = Aggregator::builder(registry, MokaResultCache::new(config.cache_capacity))
        .adapters(adapters)
        .config(config)
        .build();

    let (store, has_database): (Arc<dyn JobPostingStore>, bool) =
        match DatabaseConfig::from_env_optional()? {
            Some(db_config) => {
                let db = Database::connect(&db_config).await?;
                db.migrate().await?;
                (Arc::new(db.posting_repo()), true)
            }
            None => {
                tracing::info!("DATABASE_URL not set, serving provider results only");
                (Arc::new(NullStore), false)
            }
        };

    let state = Arc::new(AppState {
        aggregator,
        store,
        has_database,
    });

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    tracing::info!("Starting server on {addr}");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
