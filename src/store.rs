//! sqlite-backed article store.
//!
//! URL uniqueness is enforced by the table itself. A second insert of the
//! same canonical URL is reported as a duplicate, never as an error.

use std::str::FromStr;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::models::{ArticleRecord, CanonicalArticle};
use crate::utils::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(i64),
    Duplicate,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSummary {
    pub inserted: usize,
    pub duplicates: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ArticleOrder {
    Relevance,
    #[default]
    Captured,
}

/// Read-only filter for presenting stored articles.
#[derive(Debug, Clone, Default)]
pub struct ArticleQuery {
    pub since: Option<NaiveDate>,
    pub min_relevance: Option<i64>,
    pub order: ArticleOrder,
    pub limit: Option<i64>,
}

#[derive(Clone)]
pub struct ArticleStore {
    pool: SqlitePool,
}

impl ArticleStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);
        // every connection to :memory: would see its own empty database
        let max_connections = if config.url.contains(":memory:") {
            1
        } else {
            config.max_connections
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout))
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Article store ready at {}", config.url);

        Ok(Self { pool })
    }

    pub async fn in_memory() -> Result<Self> {
        Self::connect(&DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            acquire_timeout: 5,
        })
        .await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// One autocommitted insert. A unique violation on `url` is a duplicate;
    /// any other database error is returned.
    pub async fn insert(&self, article: &CanonicalArticle) -> Result<InsertOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO articles (source, url, title, description, scraped_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&article.source)
        .bind(&article.url)
        .bind(&article.title)
        .bind(&article.description)
        .bind(Utc::now().naive_utc())
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(InsertOutcome::Inserted(done.last_insert_rowid())),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                debug!("Duplicate article {}", article.url);
                Ok(InsertOutcome::Duplicate)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn commit(&self, articles: &[CanonicalArticle]) -> Result<CommitSummary> {
        let mut summary = CommitSummary::default();
        for article in articles {
            match self.insert(article).await? {
                InsertOutcome::Inserted(_) => summary.inserted += 1,
                InsertOutcome::Duplicate => summary.duplicates += 1,
            }
        }
        info!(
            "Database: {} added, {} skipped (duplicates)",
            summary.inserted, summary.duplicates
        );
        Ok(summary)
    }

    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn count_by_source(&self) -> Result<Vec<(String, i64)>> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT source, COUNT(*) FROM articles GROUP BY source ORDER BY source",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get(&self, id: i64) -> Result<Option<ArticleRecord>> {
        let record = sqlx::query_as::<_, ArticleRecord>("SELECT * FROM articles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    /// The classification work queue: rows whose relevance is still NULL, oldest first.
    pub async fn pending_classification(&self, limit: i64) -> Result<Vec<ArticleRecord>> {
        let rows = sqlx::query_as::<_, ArticleRecord>(
            r#"
            SELECT * FROM articles
            WHERE relevance IS NULL
            ORDER BY scraped_at ASC, id ASC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Writes a classification back. Relevance is clamped to 0..=100.
    pub async fn record_classification(&self, id: i64, relevance: i64, comment: &str) -> Result<()> {
        let done = sqlx::query("UPDATE articles SET relevance = ?, comment = ? WHERE id = ?")
            .bind(relevance.clamp(0, 100))
            .bind(comment)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if done.rows_affected() == 0 {
            return Err(AppError::Validation(format!("no article with id {}", id)));
        }
        Ok(())
    }

    pub async fn query(&self, query: &ArticleQuery) -> Result<Vec<ArticleRecord>> {
        // Stored as naive UTC text; `datetime()` also covers rows written by the column default.
        let since: Option<NaiveDateTime> = query.since.and_then(|d| d.and_hms_opt(0, 0, 0));
        let order = match query.order {
            ArticleOrder::Relevance => "relevance DESC, scraped_at DESC",
            ArticleOrder::Captured => "scraped_at DESC, id DESC",
        };
        let sql = format!(
            r#"
            SELECT * FROM articles
            WHERE (? IS NULL OR datetime(scraped_at) >= datetime(?))
              AND (? IS NULL OR relevance >= ?)
            ORDER BY {}
            LIMIT ?
            "#,
            order
        );

        let rows = sqlx::query_as::<_, ArticleRecord>(&sql)
            .bind(since)
            .bind(since)
            .bind(query.min_relevance)
            .bind(query.min_relevance)
            .bind(query.limit.unwrap_or(-1))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}
