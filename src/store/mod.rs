//! Warehouse storage abstraction.
//!
//! The [`ArticleStore`] trait is the seam between the ingestion sink and the
//! warehouse. Every implementation must make [`insert_batch`](ArticleStore::insert_batch)
//! all-or-nothing: either every row of the batch is visible afterwards, or
//! none is.
//!
//! | Backend | Purpose |
//! |---------|---------|
//! | [`SqliteStore`] | sqlx-backed warehouse table |
//! | [`MemoryStore`] | in-process table for tests and dry runs |
//!
//! The batch deadline is enforced inside the store, not around it: a commit
//! that has been handed to the database is always awaited, so a batch can
//! never be reported as timed out after its rows became visible.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::IngestError;
use crate::models::{PersistedRow, StoredArticle};

#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Write all rows in one transaction.
    ///
    /// `timeout` bounds the work before commit. If it expires the batch is
    /// rolled back and [`IngestError::Timeout`] is returned.
    ///
    /// Returns the number of rows actually inserted, which is lower than
    /// `rows.len()` only under [`DuplicatePolicy::Skip`](crate::config::DuplicatePolicy::Skip).
    async fn insert_batch(
        &self,
        rows: &[PersistedRow],
        timeout: Duration,
    ) -> Result<u64, IngestError>;

    /// Total number of stored rows.
    async fn count(&self) -> Result<u64, IngestError>;

    /// The most recently inserted rows, newest first.
    async fn recent(&self, limit: i64) -> Result<Vec<StoredArticle>, IngestError>;
}
