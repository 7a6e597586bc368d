use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::config::WarehouseConfig;

/// Open the warehouse pool from a connection profile such as
/// `sqlite://data/articles.sqlite`. A bare path is accepted too.
pub async fn connect(warehouse: &WarehouseConfig, profile: &str) -> sqlx::Result<SqlitePool> {
    let url = if profile.starts_with("sqlite:") {
        profile.to_string()
    } else {
        format!("sqlite:{}", profile)
    };

    let options = SqliteConnectOptions::from_str(&url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    if let Some(parent) = options.get_filename().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    SqlitePoolOptions::new()
        .max_connections(warehouse.max_connections)
        .acquire_timeout(warehouse.timeout())
        .connect_with(options)
        .await
}
