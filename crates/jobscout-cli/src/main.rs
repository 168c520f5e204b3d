use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use jobscout_client::{HttpClient, ProviderCredentials, build_adapters};
use jobscout_core::models::DEFAULT_RADIUS;
use jobscout_core::pagination::{Page, paginate, with_user_submitted};
use jobscout_core::traits::UserPostingFilter;
use jobscout_core::{
    AggregationResult, Aggregator, AggregatorConfig, AppError, MokaResultCache, NormalizedJob,
    SearchParams, SourceRegistry,
};
use jobscout_db::{Database, DatabaseConfig};

#[derive(Parser)]
#[command(name = "jobscout", version, about = "Search jobs across multiple job boards")]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Commands,
}

/// Settings shared by every subcommand. Unset values fall back to the
/// environment and then to the built-in defaults.
#[derive(Args, Debug, Default)]
struct Settings {
    /// JSON file describing the job sources
    #[arg(long, env = "JOBSCOUT_SOURCES_FILE", global = true)]
    sources_file: Option<PathBuf>,

    /// Timeout for a single provider call
    #[arg(long, env = "JOBSCOUT_PROVIDER_TIMEOUT_MS", global = true)]
    provider_timeout_ms: Option<u64>,

    /// Deadline for the whole fan-out
    #[arg(long, env = "JOBSCOUT_AGGREGATION_TIMEOUT_MS", global = true)]
    aggregation_timeout_ms: Option<u64>,

    #[arg(long, env = "JOBSCOUT_CACHE_CAPACITY", global = true)]
    cache_capacity: Option<u64>,

    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    database_url: Option<String>,
}

impl Settings {
    fn aggregator_config(&self) -> Result<AggregatorConfig, AppError> {
        AggregatorConfig::from_lookup(|key| match key {
            "JOBSCOUT_PROVIDER_TIMEOUT_MS" => self.provider_timeout_ms.map(|v| v.to_string()),
            "JOBSCOUT_AGGREGATION_TIMEOUT_MS" => {
                self.aggregation_timeout_ms.map(|v| v.to_string())
            }
            "JOBSCOUT_CACHE_CAPACITY" => self.cache_capacity.map(|v| v.to_string()),
            other => std::env::var(other).ok(),
        })
    }

    fn registry(&self) -> Result<SourceRegistry, AppError> {
        match &self.sources_file {
            Some(path) => {
                tracing::info!(path = %path.display(), "Loading source registry");
                SourceRegistry::from_json_file(path)
            }
            None => Ok(SourceRegistry::builtin()),
        }
    }

    fn database_config(&self) -> Result<DatabaseConfig, AppError> {
        DatabaseConfig::from_lookup(|key| match key {
            "DATABASE_URL" => self.database_url.clone(),
            other => std::env::var(other).ok(),
        })
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run one aggregated search and print a page of results
    Search {
        /// Free-text keywords
        #[arg(short, long)]
        query: Option<String>,

        #[arg(short, long)]
        location: Option<String>,

        /// Search radius in miles
        #[arg(long, default_value_t = DEFAULT_RADIUS)]
        radius: u32,

        /// e.g. "full-time", "contract"
        #[arg(long)]
        job_type: Option<String>,

        /// e.g. "senior", "entry"
        #[arg(long)]
        experience_level: Option<String>,

        /// e.g. "50000-80000" or "60k+"
        #[arg(long)]
        salary_range: Option<String>,

        /// Only remote (true) or only non-remote (false) jobs
        #[arg(long)]
        remote: Option<bool>,

        #[arg(short, long, default_value_t = 1)]
        page: usize,

        #[arg(long, default_value_t = 20)]
        limit: usize,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,

        /// Append user-submitted postings from the database (requires DATABASE_URL)
        #[arg(long, default_value_t = false)]
        with_user_postings: bool,
    },

    /// Show configured job sources and whether each has an adapter
    Sources,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
    Table,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("jobscout=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Search {
            query,
            location,
            radius,
            job_type,
            experience_level,
            salary_range,
            remote,
            page,
            limit,
            format,
            with_user_postings,
        } => {
            let params = SearchParams {
                query,
                location,
                radius,
                salary_range,
                job_type,
                experience_level,
                remote,
                limit,
                page,
            };
            cmd_search(&cli.settings, params, format, with_user_postings).await?;
        }
        Commands::Sources => cmd_sources(&cli.settings)?,
    }

    Ok(())
}

fn build_aggregator(settings: &Settings) -> Result<Aggregator<MokaResultCache>> {
    let config = settings
        .aggregator_config()
        .context("Invalid aggregator configuration")?;
    let registry = Arc::new(settings.registry().context("Failed to load source registry")?);
    let http = HttpClient::with_timeout(config.provider_timeout)?;
    let adapters = build_adapters(&registry, &ProviderCredentials::from_env(), &http);

    Ok(
        Aggregator::builder(registry, MokaResultCache::new(config.cache_capacity))
            .adapters(adapters)
            .config(config)
            .build(),
    )
}

async fn cmd_search(
    settings: &Settings,
    params: SearchParams,
    format: OutputFormat,
    with_user_postings: bool,
) -> Result<()> {
    params.validate()?;
    let aggregator = build_aggregator(settings)?;

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let Some(mut result) = aggregator.aggregate_jobs_cancellable(&params, &cancel).await else {
        eprintln!("Search cancelled");
        return Ok(());
    };

    if with_user_postings {
        let db = Database::connect(&settings.database_config()?)
            .await
            .context("Failed to connect to database")?;
        let user_jobs = db
            .posting_repo()
            .find_user_submitted(&UserPostingFilter::from_params(&params))
            .await?;
        result = with_user_submitted(result, user_jobs);
    }

    for report in &result.diagnostics {
        tracing::debug!(source = %report.source, status = ?report.status, "Source outcome");
    }

    let page = paginate(&result.jobs, params.page, params.limit);
    let mut out = std::io::stdout().lock();
    match format {
        OutputFormat::Json => write_json(&mut out, &result, &page)?,
        OutputFormat::Csv => write_csv(&mut out, page.items)?,
        OutputFormat::Table => write_table(&mut out, &result, &page)?,
    }
    Ok(())
}

fn cmd_sources(settings: &Settings) -> Result<()> {
    let registry = settings.registry()?;
    let http = HttpClient::new()?;
    let adapters = build_adapters(&registry, &ProviderCredentials::from_env(), &http);

    println!(
        "{:<16} {:>8} {:<12} {:<8} {:<14} {}",
        "NAME", "PRIORITY", "API", "ENABLED", "RATE LIMIT", "ADAPTER"
    );
    for source in registry.all() {
        let available = adapters.iter().any(|a| a.source_name() == source.name);
        let rate = if source.rate_limit == 0 {
            "unlimited".to_string()
        } else {
            format!("{}/{}s", source.rate_limit, source.rate_window_secs)
        };
        println!(
            "{:<16} {:>8} {:<12} {:<8} {:<14} {}",
            truncate(&source.name, 16),
            source.priority,
            truncate(&source.api, 12),
            if source.enabled { "yes" } else { "no" },
            rate,
            if available { "ready" } else { "missing" },
        );
    }
    Ok(())
}

fn write_json(
    out: &mut impl Write,
    result: &AggregationResult,
    page: &Page<'_, NormalizedJob>,
) -> Result<()> {
    let body = serde_json::json!({
        "jobs": page.items,
        "total": page.total,
        "page": page.page,
        "limit": page.limit,
        "total_pages": page.total_pages,
        "has_more": page.has_more,
        "sources": result.sources,
        "cache_hit": result.cache_hit,
        "execution_time_ms": result.execution_time_ms,
        "diagnostics": result.diagnostics,
    });
    serde_json::to_writer_pretty(&mut *out, &body)?;
    writeln!(out)?;
    Ok(())
}

fn write_csv(out: &mut impl Write, jobs: &[NormalizedJob]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record([
        "id", "title", "company", "location", "salary", "job_type", "experience", "remote",
        "source", "date_posted", "url",
    ])?;
    for job in jobs {
        writer.write_record([
            job.id.as_str(),
            job.title.as_str(),
            job.company.as_str(),
            job.location.as_str(),
            job.salary.as_deref().unwrap_or(""),
            job.job_type.as_str(),
            job.experience.as_str(),
            job.remote.as_str(),
            job.source.name.as_str(),
            job.date_posted.to_rfc3339().as_str(),
            job.source_url.as_deref().unwrap_or(""),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_table(
    out: &mut impl Write,
    result: &AggregationResult,
    page: &Page<'_, NormalizedJob>,
) -> Result<()> {
    if page.items.is_empty() {
        writeln!(out, "No jobs found.")?;
    }
    for job in page.items {
        let marker = if job.is_ai_recommended { "*" } else { " " };
        writeln!(
            out,
            "{marker} {:<40} {:<24} {:<20} {:<8} {:<12} {}",
            truncate(&job.title, 40),
            truncate(&job.company, 24),
            truncate(&job.location, 20),
            job.remote,
            truncate(&job.source.name, 12),
            job.date_posted.format("%Y-%m-%d"),
        )?;
    }
    writeln!(
        out,
        "\nPage {}/{} ({} jobs from {}; {} ms{})",
        page.page,
        page.total_pages.max(1),
        page.total,
        if result.sources.is_empty() {
            "no sources".to_string()
        } else {
            result.sources.join(", ")
        },
        result.execution_time_ms,
        if result.cache_hit { ", cached" } else { "" },
    )?;
    Ok(())
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let cut: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobscout_core::testutil::make_job;

    fn sample() -> AggregationResult {
        let mut job = make_job("a1", "Rust, \"Async\" Engineer", "Acme", "Berlin", "Alpha", 1);
        job.is_ai_recommended = true;
        AggregationResult {
            jobs: vec![job, make_job("b1", "Designer", "Pixel", "Paris", "Beta", 2)],
            total: 2,
            sources: vec!["Alpha".into(), "Beta".into()],
            ..AggregationResult::empty()
        }
    }

    #[test]
    fn cli_parses_search_flags() {
        let cli = Cli::try_parse_from([
            "jobscout", "search", "-q", "rust", "--remote", "true", "--limit", "5", "-f", "csv",
        ])
        .unwrap();
        match cli.command {
            Commands::Search {
                query,
                remote,
                limit,
                format,
                radius,
                ..
            } => {
                assert_eq!(query.as_deref(), Some("rust"));
                assert_eq!(remote, Some(true));
                assert_eq!(limit, 5);
                assert_eq!(radius, DEFAULT_RADIUS);
                assert!(matches!(format, OutputFormat::Csv));
            }
            Commands::Sources => panic!("expected search"),
        }
    }

    #[test]
    fn global_settings_override_defaults() {
        let cli = Cli::try_parse_from([
            "jobscout",
            "sources",
            "--provider-timeout-ms",
            "1500",
            "--cache-capacity",
            "10",
        ])
        .unwrap();
        let config = cli.settings.aggregator_config().unwrap();
        assert_eq!(config.provider_timeout, std::time::Duration::from_millis(1500));
        assert_eq!(config.cache_capacity, 10);
    }

    #[test]
    fn provider_timeout_cannot_exceed_deadline() {
        let settings = Settings {
            provider_timeout_ms: Some(9000),
            aggregation_timeout_ms: Some(2000),
            ..Settings::default()
        };
        assert!(settings.aggregator_config().is_err());
    }

    #[test]
    fn csv_output_quotes_fields() {
        let result = sample();
        let mut buf = Vec::new();
        write_csv(&mut buf, &result.jobs).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("id,title,company"));
        assert!(lines.next().unwrap().starts_with("a1,\"Rust, \"\"Async\"\" Engineer\",Acme"));
        assert_eq!(lines.count(), 1);
    }

    #[test]
    fn json_output_has_page_metadata() {
        let result = sample();
        let page = paginate(&result.jobs, 1, 1);
        let mut buf = Vec::new();
        write_json(&mut buf, &result, &page).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(json["total"], 2);
        assert_eq!(json["has_more"], true);
        assert_eq!(json["jobs"].as_array().unwrap().len(), 1);
        assert_eq!(json["sources"][1], "Beta");
    }

    #[test]
    fn table_marks_recommended_jobs() {
        let result = sample();
        let page = paginate(&result.jobs, 1, 20);
        let mut buf = Vec::new();
        write_table(&mut buf, &result, &page).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.lines().next().unwrap().starts_with("* Rust"));
        assert!(text.contains("Page 1/1 (2 jobs from Alpha, Beta"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Zürich Hauptbahnhof", 9), "Zürich...");
    }
}
