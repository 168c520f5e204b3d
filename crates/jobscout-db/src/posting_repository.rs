use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jobscout_core::error::AppError;
use jobscout_core::models::{NormalizedJob, RemoteLabel, SourceRef};
use jobscout_core::traits::{JobPostingStore, UserPostingFilter};
use jobscout_core::util::fold;
use sqlx::{PgPool, Pool, Postgres};
use uuid::Uuid;

/// Read-only access to user-submitted postings in the `job_postings` table.
#[derive(Clone)]
pub struct UserPostingRepository {
    pool: Pool<Postgres>,
}

impl UserPostingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Active user-submitted postings matching `filter`, newest first.
    ///
    /// The query filter matches title, company or description and the
    /// location filter matches location, both case-insensitively.
    pub async fn find_user_submitted(
        &self,
        filter: &UserPostingFilter,
    ) -> Result<Vec<NormalizedJob>, AppError> {
        let limit = if filter.limit == 0 {
            UserPostingFilter::DEFAULT_LIMIT
        } else {
            filter.limit
        };

        let rows = sqlx::query_as::<_, PostingRow>(
            r#"
            SELECT id, title, company, location, salary, job_type, experience_level,
                   description, tags, remote_type, application_url, company_logo, created_at
            FROM job_postings
            WHERE status = 'active'
              AND source = 'user_submitted'
              AND ($1::TEXT IS NULL OR title ILIKE $1 OR company ILIKE $1 OR description ILIKE $1)
              AND ($2::TEXT IS NULL OR location ILIKE $2)
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(filter.query.as_deref().map(contains_pattern))
        .bind(filter.location.as_deref().map(contains_pattern))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        tracing::debug!(rows = rows.len(), "Loaded user-submitted postings");
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        Ok(())
    }
}

/// `%term%` with LIKE wildcards in `term` escaped.
fn contains_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn remote_label(raw: &str) -> RemoteLabel {
    match fold(raw).as_str() {
        "remote" => RemoteLabel::Remote,
        "hybrid" => RemoteLabel::Hybrid,
        _ => RemoteLabel::OnSite,
    }
}

// -- Internal row type for sqlx deserialization --

#[derive(sqlx::FromRow)]
struct PostingRow {
    id: Uuid,
    title: String,
    company: String,
    location: String,
    salary: Option<String>,
    job_type: String,
    experience_level: String,
    description: String,
    tags: Vec<String>,
    remote_type: String,
    application_url: Option<String>,
    company_logo: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<PostingRow> for NormalizedJob {
    fn from(row: PostingRow) -> Self {
        NormalizedJob {
            id: format!("user-{}", row.id),
            title: row.title,
            company: row.company,
            location: row.location,
            salary: row.salary.filter(|s| !s.trim().is_empty()),
            job_type: row.job_type,
            experience: row.experience_level,
            description: row.description,
            tags: row.tags.iter().map(|t| fold(t)).collect::<BTreeSet<_>>(),
            source: SourceRef::user_submitted(),
            source_url: row.application_url,
            remote: remote_label(&row.remote_type),
            date_posted: row.created_at,
            logo: row.company_logo,
            is_ai_recommended: false,
        }
    }
}

// -- Trait implementation --

#[async_trait]
impl JobPostingStore for UserPostingRepository {
    async fn find_user_submitted(
        &self,
        filter: &UserPostingFilter,
    ) -> Result<Vec<NormalizedJob>, AppError> {
        UserPostingRepository::find_user_submitted(self, filter).await
    }

    async fn health_check(&self) -> Result<(), AppError> {
        UserPostingRepository::health_check(self).await
    }
}
