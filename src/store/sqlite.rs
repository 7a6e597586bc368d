//! SQLite warehouse backend.

use async_trait::async_trait;
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::time::Duration;
use tokio::time::Instant;

use crate::config::DuplicatePolicy;
use crate::error::IngestError;
use crate::models::{PersistedRow, StoredArticle};

use super::ArticleStore;

const INSERT_ARTICLE: &str =
    "INSERT INTO articles (title, text, url, published_date) VALUES (?, ?, ?, ?)";
const INSERT_ARTICLE_IGNORE: &str =
    "INSERT OR IGNORE INTO articles (title, text, url, published_date) VALUES (?, ?, ?, ?)";

/// `articles` table behind a shared pool.
///
/// The pool is process-wide; a connection is checked out only for the
/// duration of one batch and returned when the transaction ends.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    duplicates: DuplicatePolicy,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool, duplicates: DuplicatePolicy) -> Self {
        Self { pool, duplicates }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl ArticleStore for SqliteStore {
    async fn insert_batch(
        &self,
        rows: &[PersistedRow],
        timeout: Duration,
    ) -> Result<u64, IngestError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let sql = match self.duplicates {
            DuplicatePolicy::Skip => INSERT_ARTICLE_IGNORE,
            DuplicatePolicy::Allow | DuplicatePolicy::Reject => INSERT_ARTICLE,
        };
        let deadline = Instant::now() + timeout;

        let mut tx = match tokio::time::timeout_at(deadline, self.pool.begin()).await {
            Ok(tx) => tx?,
            Err(_) => return Err(IngestError::Timeout(timeout)),
        };

        let staged = tokio::time::timeout_at(deadline, insert_rows(&mut tx, sql, rows)).await;
        match staged {
            Ok(Ok(written)) => {
                // Not bounded by the deadline: once COMMIT is queued its
                // outcome is the batch outcome.
                tx.commit().await?;
                Ok(written)
            }
            Ok(Err(e)) => {
                rollback(tx).await;
                Err(e)
            }
            Err(_) => {
                tracing::warn!(rows = rows.len(), "batch deadline passed before commit; rolling back");
                rollback(tx).await;
                Err(IngestError::Timeout(timeout))
            }
        }
    }

    async fn count(&self) -> Result<u64, IngestError> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles")
            .fetch_one(&self.pool)
            .await?;
        Ok(n as u64)
    }

    async fn recent(&self, limit: i64) -> Result<Vec<StoredArticle>, IngestError> {
        let rows = sqlx::query_as::<_, StoredArticle>(
            "SELECT title, url, published_date FROM articles ORDER BY rowid DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

async fn insert_rows(
    conn: &mut SqliteConnection,
    sql: &str,
    rows: &[PersistedRow],
) -> Result<u64, IngestError> {
    let mut written = 0u64;
    for row in rows {
        let result = sqlx::query(sql)
            .bind(&row.title)
            .bind(&row.text)
            .bind(&row.url)
            .bind(row.published_date)
            .execute(&mut *conn)
            .await
            .map_err(classify)?;
        written += result.rows_affected();
    }
    Ok(written)
}

/// Explicit rollback. If it fails the guard still rolls back on drop.
async fn rollback(tx: Transaction<'static, Sqlite>) {
    if let Err(e) = tx.rollback().await {
        tracing::warn!(error = %e, "rollback failed");
    }
}

fn classify(err: sqlx::Error) -> IngestError {
    if let Some(db) = err.as_database_error() {
        if db.is_unique_violation() {
            return IngestError::Rejected(db.message().to_string());
        }
    }
    IngestError::Database(err)
}
