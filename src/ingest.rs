//! Ingestion sink: documents → warehouse rows in one atomic batch.
//!
//! Row policy: a document is written only when both its title and its text
//! are non-empty. Incomplete documents are skipped and counted, never
//! written with placeholder values. A missing published date is stored as
//! `NULL`.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::IngestError;
use crate::models::{Document, PersistedRow};
use crate::store::ArticleStore;

/// Outcome of one successful batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Rows committed to the warehouse.
    pub rows_written: u64,
    /// Documents left out because their title or text was blank.
    pub skipped: u64,
}

impl IngestReport {
    pub fn empty() -> Self {
        Self {
            rows_written: 0,
            skipped: 0,
        }
    }
}

/// Rows for every eligible document, in input order, plus the skip count.
pub fn build_rows(documents: &[Document]) -> (Vec<PersistedRow>, u64) {
    let mut rows = Vec::with_capacity(documents.len());
    let mut skipped = 0u64;
    for doc in documents {
        match doc.to_row() {
            Some(row) => rows.push(row),
            None => {
                tracing::debug!(title = %doc.title, "skipping document without text");
                skipped += 1;
            }
        }
    }
    (rows, skipped)
}

/// Write `documents` as one batch, bounded by `timeout`.
///
/// An empty input is a no-op success. The deadline is handed to the store,
/// which rolls back if it expires before commit; a commit that has started
/// is always awaited.
pub async fn ingest(
    store: &dyn ArticleStore,
    documents: &[Document],
    timeout: Duration,
) -> Result<IngestReport, IngestError> {
    let (rows, skipped) = build_rows(documents);
    if rows.is_empty() {
        return Ok(IngestReport {
            rows_written: 0,
            skipped,
        });
    }

    let started = Instant::now();
    let rows_written = store.insert_batch(&rows, timeout).await?;

    tracing::info!(
        rows_written,
        skipped,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "batch committed"
    );

    Ok(IngestReport {
        rows_written,
        skipped,
    })
}
