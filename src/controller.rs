//! Interaction controller: one submit runs intake → search → ingest → display.
//!
//! ```text
//!          submit(q)                 ┌──▶ Displaying ──┐
//!   Idle ───────────▶ Searching ─────┼──▶ NoResults  ──┼──▶ Idle
//!                                    └──▶ SearchFailed ┘
//! ```
//!
//! Ingest failure is reported in the view but is not a failure phase:
//! results are displayed whether or not they were persisted. A failed search
//! clears the previous results. A blank submit is ignored. A submit that
//! arrives while the same session is mid-invocation is rejected with
//! [`SessionBusy`]; nothing is queued.

use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::SearchError;
use crate::ingest::{ingest, IngestReport};
use crate::models::{Document, Query};
use crate::search::{search, SearchProvider};
use crate::store::ArticleStore;

/// Services shared by every session. Cheap to clone.
#[derive(Clone)]
pub struct Pipeline {
    pub search: Arc<dyn SearchProvider>,
    pub store: Arc<dyn ArticleStore>,
    pub max_results: usize,
    pub ingest_timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Searching,
    Displaying,
    NoResults,
    SearchFailed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SearchStatus {
    Found { count: usize },
    NoResults,
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IngestStatus {
    Saved { rows_written: u64, skipped: u64 },
    Failed { message: String },
}

/// Everything the display layer needs for one session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionView {
    pub query: Option<String>,
    pub search: Option<SearchStatus>,
    pub ingest: Option<IngestStatus>,
    pub results: Vec<Document>,
}

/// A completed invocation: the phase it ended in before returning to idle,
/// and the view it published.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub terminal: Phase,
    pub view: SessionView,
}

#[derive(Debug)]
pub enum Submission {
    Ignored,
    Completed(Invocation),
}

#[derive(Debug, thiserror::Error)]
#[error("a search is already running for this session")]
pub struct SessionBusy;

pub struct Session {
    pipeline: Pipeline,
    view: tokio::sync::Mutex<SessionView>,
    phase: Arc<Mutex<Phase>>,
}

/// Puts the session back to `Idle` when the invocation ends, including
/// when its future is dropped half-way.
struct IdleOnDrop(Arc<Mutex<Phase>>);

impl Drop for IdleOnDrop {
    fn drop(&mut self) {
        set(&self.0, Phase::Idle);
    }
}

fn set(phase: &Mutex<Phase>, to: Phase) {
    let mut p = phase.lock().unwrap_or_else(|e| e.into_inner());
    *p = to;
}

impl Session {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            view: tokio::sync::Mutex::new(SessionView::default()),
            phase: Arc::new(Mutex::new(Phase::Idle)),
        }
    }

    pub fn phase(&self) -> Phase {
        *self.phase.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Latest published view, or `None` while an invocation is running.
    pub fn snapshot(&self) -> Option<SessionView> {
        self.view.try_lock().ok().map(|v| v.clone())
    }

    pub async fn submit(&self, raw: &str) -> Result<Submission, SessionBusy> {
        let mut view = self.view.try_lock().map_err(|_| SessionBusy)?;

        let Some(query) = Query::parse(raw) else {
            return Ok(Submission::Ignored);
        };

        set(&self.phase, Phase::Searching);
        let _idle = IdleOnDrop(self.phase.clone());

        let p = &self.pipeline;
        let terminal = match search(p.search.as_ref(), query.as_str(), p.max_results).await {
            Err(e) => {
                *view = failed_view(&query, &e);
                Phase::SearchFailed
            }
            Ok(docs) if docs.is_empty() => {
                *view = SessionView {
                    query: Some(query.to_string()),
                    search: Some(SearchStatus::NoResults),
                    ingest: None,
                    results: Vec::new(),
                };
                Phase::NoResults
            }
            Ok(docs) => {
                let ingest_status = match ingest(p.store.as_ref(), &docs, p.ingest_timeout).await {
                    Ok(IngestReport {
                        rows_written,
                        skipped,
                    }) => IngestStatus::Saved {
                        rows_written,
                        skipped,
                    },
                    Err(e) => {
                        tracing::error!(query = %query, error = %e, "ingest failed; displaying anyway");
                        IngestStatus::Failed {
                            message: e.to_string(),
                        }
                    }
                };
                *view = SessionView {
                    query: Some(query.to_string()),
                    search: Some(SearchStatus::Found { count: docs.len() }),
                    ingest: Some(ingest_status),
                    results: docs,
                };
                Phase::Displaying
            }
        };
        set(&self.phase, terminal);

        Ok(Submission::Completed(Invocation {
            terminal,
            view: view.clone(),
        }))
    }
}

/// A failed search publishes no results, so nothing stale stays on screen.
fn failed_view(query: &Query, err: &SearchError) -> SessionView {
    SessionView {
        query: Some(query.to_string()),
        search: Some(SearchStatus::Failed {
            message: err.to_string(),
        }),
        ingest: None,
        results: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use tokio::sync::Notify;

    struct Fixed(Result<Vec<Document>, ()>);

    #[async_trait]
    impl SearchProvider for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }
        async fn search(&self, _: &Query, _: usize) -> Result<Vec<Document>, SearchError> {
            self.0
                .clone()
                .map_err(|_| SearchError::Timeout(Duration::from_secs(20)))
        }
    }

    fn pipeline(provider: impl SearchProvider + 'static) -> Pipeline {
        Pipeline {
            search: Arc::new(provider),
            store: Arc::new(MemoryStore::default()),
            max_results: 5,
            ingest_timeout: Duration::from_secs(5),
        }
    }

    fn completed(s: Submission) -> Invocation {
        match s {
            Submission::Completed(inv) => inv,
            Submission::Ignored => panic!("expected a completed invocation"),
        }
    }

    #[tokio::test]
    async fn blank_submit_is_ignored() {
        let session = Session::new(pipeline(Fixed(Ok(vec![]))));
        assert!(matches!(session.submit("  ").await.unwrap(), Submission::Ignored));
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.snapshot().unwrap().query.is_none());
    }

    #[tokio::test]
    async fn failure_clears_previous_results() {
        let docs = vec![Document::new("a").with_text("b")];
        let ok = Session::new(pipeline(Fixed(Ok(docs))));
        let inv = completed(ok.submit("first").await.unwrap());
        assert_eq!(inv.terminal, Phase::Displaying);
        assert_eq!(inv.view.results.len(), 1);

        // Same session object, provider now failing.
        let failing = Session {
            pipeline: pipeline(Fixed(Err(()))),
            view: tokio::sync::Mutex::new(inv.view),
            phase: Arc::new(Mutex::new(Phase::Idle)),
        };
        let inv = completed(failing.submit("second").await.unwrap());
        assert_eq!(inv.terminal, Phase::SearchFailed);
        assert!(inv.view.results.is_empty());
        assert!(inv.view.ingest.is_none());
        assert_eq!(failing.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn overlapping_submit_is_rejected() {
        struct Gate(Arc<Notify>, Arc<Notify>);

        #[async_trait]
        impl SearchProvider for Gate {
            fn name(&self) -> &str {
                "gate"
            }
            async fn search(&self, _: &Query, _: usize) -> Result<Vec<Document>, SearchError> {
                self.0.notify_one();
                self.1.notified().await;
                Ok(vec![])
            }
        }

        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let session = Arc::new(Session::new(pipeline(Gate(entered.clone(), release.clone()))));

        let running = {
            let session = session.clone();
            tokio::spawn(async move { session.submit("slow").await })
        };
        entered.notified().await;

        assert_eq!(session.phase(), Phase::Searching);
        assert!(session.submit("again").await.is_err());
        assert!(session.snapshot().is_none());

        release.notify_one();
        let inv = completed(running.await.unwrap().unwrap());
        assert_eq!(inv.terminal, Phase::NoResults);
        assert_eq!(session.phase(), Phase::Idle);
    }
}
