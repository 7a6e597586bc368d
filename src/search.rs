//! Search client: query → ranked documents from the hosted search provider.
//!
//! [`SearchProvider`] is the seam; [`ExaProvider`] talks to an Exa-style
//! `POST /search` endpoint. [`search`] wraps any provider with the pipeline
//! guarantees:
//!
//! - the query is non-empty after trimming,
//! - at most `max_results` documents come back, in provider order,
//! - every document has a non-empty title,
//! - an empty result is `Ok(vec![])`, never an error.
//!
//! One attempt per call. Timeouts surface as [`SearchError::Timeout`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::models::{parse_published_date, Document, Query};

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &str;

    /// Run one search. Implementations may return untitled or surplus
    /// results; [`search`] filters them.
    async fn search(&self, query: &Query, max_results: usize) -> Result<Vec<Document>, SearchError>;
}

/// Run `query` through `provider` and enforce the result contract.
pub async fn search(
    provider: &dyn SearchProvider,
    query: &str,
    max_results: usize,
) -> Result<Vec<Document>, SearchError> {
    let query = Query::parse(query).ok_or(SearchError::EmptyQuery)?;
    let max_results = max_results.max(1);

    let started = Instant::now();
    let raw = provider.search(&query, max_results).await.inspect_err(|e| {
        tracing::warn!(provider = provider.name(), query = %query, error = %e, "search failed");
    })?;

    let returned = raw.len();
    let docs: Vec<Document> = raw
        .into_iter()
        .filter(|d| {
            let keep = !d.title.trim().is_empty();
            if !keep {
                tracing::warn!(url = ?d.url, "dropping untitled search result");
            }
            keep
        })
        .take(max_results)
        .collect();

    tracing::info!(
        provider = provider.name(),
        query = %query,
        returned,
        kept = docs.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "search complete"
    );
    Ok(docs)
}

// ============ Exa-style provider ============

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    query: &'a str,
    #[serde(rename = "type")]
    search_type: &'a str,
    num_results: usize,
    contents: Contents,
}

#[derive(Serialize)]
struct Contents {
    text: bool,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchHit {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    published_date: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    score: Option<f64>,
}

impl From<SearchHit> for Document {
    fn from(hit: SearchHit) -> Self {
        Document {
            title: hit.title.unwrap_or_default().trim().to_string(),
            url: hit.url.filter(|u| !u.trim().is_empty()),
            text: hit.text.filter(|t| !t.trim().is_empty()),
            published_date: hit.published_date.as_deref().and_then(parse_published_date),
            author: hit.author.filter(|a| !a.trim().is_empty()),
            score: hit.score,
        }
    }
}

/// Hosted search-and-contents API.
///
/// Sends `{"query", "type", "numResults", "contents": {"text": true}}` with
/// the key in `x-api-key`. The reqwest client carries the configured timeout.
pub struct ExaProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    search_type: String,
    include_text: bool,
    timeout: Duration,
}

impl ExaProvider {
    pub fn new(config: &SearchConfig, api_key: String) -> Result<Self, SearchError> {
        let timeout = config.timeout();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SearchError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
            search_type: config.search_type.clone(),
            include_text: config.include_text,
            timeout,
        })
    }
}

#[async_trait]
impl SearchProvider for ExaProvider {
    fn name(&self) -> &str {
        "exa"
    }

    async fn search(&self, query: &Query, max_results: usize) -> Result<Vec<Document>, SearchError> {
        let body = SearchRequest {
            query: query.as_str(),
            search_type: &self.search_type,
            num_results: max_results,
            contents: Contents {
                text: self.include_text,
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SearchError::from_reqwest(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::from_reqwest(e, self.timeout))?;

        Ok(parsed.results.into_iter().map(Document::from).collect())
    }
}
