//! Core data types that flow through the pipeline.
//!
//! A [`Query`] produces zero or more [`Document`]s; each eligible document
//! becomes one [`PersistedRow`] in the warehouse `articles` table.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// A user query, non-empty after trimming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query(String);

impl Query {
    /// Returns `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One search result as returned by the provider, in rank order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub title: String,
    pub url: Option<String>,
    pub text: Option<String>,
    pub published_date: Option<DateTime<Utc>>,
    pub author: Option<String>,
    pub score: Option<f64>,
}

impl Document {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: None,
            text: None,
            published_date: None,
            author: None,
            score: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_published_date(mut self, date: DateTime<Utc>) -> Self {
        self.published_date = Some(date);
        self
    }

    /// The warehouse row for this document, or `None` when the title or
    /// text is blank. Incomplete documents are never written.
    pub fn to_row(&self) -> Option<PersistedRow> {
        let title = self.title.trim();
        let text = self.text.as_deref().map(str::trim).unwrap_or_default();
        if title.is_empty() || text.is_empty() {
            return None;
        }
        Some(PersistedRow {
            title: self.title.clone(),
            text: self.text.clone().unwrap_or_default(),
            url: self.url.clone().filter(|u| !u.trim().is_empty()),
            published_date: self.published_date,
        })
    }
}

/// Row shape of `articles(title, text, url, published_date)`.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedRow {
    pub title: String,
    pub text: String,
    pub url: Option<String>,
    pub published_date: Option<DateTime<Utc>>,
}

/// A row read back from the warehouse.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StoredArticle {
    pub title: Option<String>,
    pub url: Option<String>,
    pub published_date: Option<DateTime<Utc>>,
}

/// Parse a provider timestamp.
///
/// Accepts RFC 3339 (with or without fractional seconds) and bare
/// `YYYY-MM-DD` dates, which map to midnight UTC. Anything else is `None`.
pub fn parse_published_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
