use sqlx::SqlitePool;

use crate::config::DuplicatePolicy;

/// Create the `articles` table. Safe to run repeatedly.
///
/// When the duplicate policy needs it, a unique index on `url` is added.
/// Creating that index fails if the table already holds duplicate urls.
pub async fn run_migrations(pool: &SqlitePool, duplicates: DuplicatePolicy) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS articles (
            title TEXT,
            text TEXT,
            url TEXT,
            published_date TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    if duplicates.requires_unique_url() {
        sqlx::query("CREATE UNIQUE INDEX IF NOT EXISTS idx_articles_url ON articles(url)")
            .execute(pool)
            .await?;
    }

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_articles_published_date ON articles(published_date DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
