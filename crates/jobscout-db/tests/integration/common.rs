use jobscout_db::Database;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use testcontainers::core::{ContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};

/// Spins up a PostgreSQL container, runs migrations and returns a pool.
///
/// Keep the `ContainerAsync` in scope for the test duration; dropping it
/// stops the container.
pub async fn setup_test_db() -> (PgPool, ContainerAsync<GenericImage>) {
    let container = GenericImage::new("postgres", "16")
        .with_exposed_port(ContainerPort::Tcp(5432))
        .with_wait_for(WaitFor::message_on_stderr(
            "database system is ready to accept connections",
        ))
        .with_env_var("POSTGRES_PASSWORD", "postgres")
        .with_env_var("POSTGRES_DB", "jobscout_test")
        .start()
        .await
        .expect("Failed to start PostgreSQL container");

    let host = container.get_host().await.expect("Failed to get host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("Failed to get port");

    let connection_string = format!("postgresql://postgres:postgres@{host}:{port}/jobscout_test");

    // Retry until the server accepts connections
    const MAX_RETRIES: u32 = 30;
    let mut retries = 0;
    let pool = loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .connect(&connection_string)
            .await
        {
            Ok(pool) => break pool,
            Err(e) => {
                retries += 1;
                if retries >= MAX_RETRIES {
                    panic!("Failed to connect to database after {MAX_RETRIES} retries: {e}");
                }
                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            }
        }
    };

    Database::from_pool(pool.clone())
        .migrate()
        .await
        .expect("Failed to run migrations");

    (pool, container)
}

/// Insert a posting and return its id.
pub async fn insert_posting(
    pool: &PgPool,
    title: &str,
    company: &str,
    location: &str,
    source: &str,
    status: &str,
    age_hours: i32,
) -> uuid::Uuid {
    let row: (uuid::Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO job_postings (title, company, location, description, source, status, remote_type, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, 'Hybrid', NOW() - make_interval(hours => $7))
        RETURNING id
        "#,
    )
    .bind(title)
    .bind(company)
    .bind(location)
    .bind(format!("{title} role at {company}"))
    .bind(source)
    .bind(status)
    .bind(age_hours)
    .fetch_one(pool)
    .await
    .expect("Failed to insert posting");
    row.0
}
