//! In-memory [`ArticleStore`] for tests and dry runs.
//!
//! Rows live in a `Vec` behind a `std::sync::RwLock`. A batch is validated
//! against the duplicate policy before anything is appended, which gives the
//! same all-or-nothing behavior as the SQL backend.

use std::collections::HashSet;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::DuplicatePolicy;
use crate::error::IngestError;
use crate::models::{PersistedRow, StoredArticle};

use super::ArticleStore;

pub struct MemoryStore {
    rows: RwLock<Vec<PersistedRow>>,
    duplicates: DuplicatePolicy,
}

impl MemoryStore {
    pub fn new(duplicates: DuplicatePolicy) -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            duplicates,
        }
    }

    /// Snapshot of every stored row, oldest first.
    pub fn rows(&self) -> Vec<PersistedRow> {
        self.rows.read().map(|r| r.clone()).unwrap_or_default()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DuplicatePolicy::Allow)
    }
}

fn poisoned() -> IngestError {
    IngestError::Rejected("memory store poisoned".to_string())
}

#[async_trait]
impl ArticleStore for MemoryStore {
    /// Completes without awaiting, so the deadline never applies.
    async fn insert_batch(
        &self,
        rows: &[PersistedRow],
        _timeout: Duration,
    ) -> Result<u64, IngestError> {
        let mut stored = self.rows.write().map_err(|_| poisoned())?;

        let mut seen: HashSet<String> = stored.iter().filter_map(|r| r.url.clone()).collect();
        let mut staged = Vec::with_capacity(rows.len());

        for row in rows {
            if let Some(url) = &row.url {
                if self.duplicates.requires_unique_url() && !seen.insert(url.clone()) {
                    match self.duplicates {
                        DuplicatePolicy::Skip => continue,
                        _ => {
                            return Err(IngestError::Rejected(format!(
                                "UNIQUE constraint failed: articles.url ({})",
                                url
                            )))
                        }
                    }
                }
            }
            staged.push(row.clone());
        }

        let written = staged.len() as u64;
        stored.extend(staged);
        Ok(written)
    }

    async fn count(&self) -> Result<u64, IngestError> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows.len() as u64)
    }

    async fn recent(&self, limit: i64) -> Result<Vec<StoredArticle>, IngestError> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows
            .iter()
            .rev()
            .take(limit.max(0) as usize)
            .map(|r| StoredArticle {
                title: Some(r.title.clone()),
                url: r.url.clone(),
                published_date: r.published_date,
            })
            .collect())
    }
}
