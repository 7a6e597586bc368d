//! HTTP surface: the search page and a small JSON API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Search page with a single text input |
//! | `POST` | `/` | Submit the page form (`session`, `query`) |
//! | `POST` | `/api/search` | Run one invocation for a session, JSON in/out |
//! | `POST` | `/api/debate` | Generate debate arguments for a topic |
//! | `GET`  | `/api/articles` | Most recently stored rows |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "busy", "message": "a search is already running for this session" } }
//! ```
//!
//! Error codes: `bad_request` (400), `llm_disabled` (400), `busy` (409),
//! `internal` (500). Search and ingest failures are not HTTP errors; they
//! are part of the returned session view.
//!
//! # Sessions
//!
//! A request that names a session reuses it, which is what makes `busy`
//! possible. A request without one runs on a fresh session that is not kept;
//! the response carries a new id the client may send back.

use axum::{
    extract::{Query as QueryParams, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tower_http::cors::{Any, CorsLayer};

use crate::completion::CompletionProvider;
use crate::config::ServerConfig;
use crate::controller::{Phase, Pipeline, Session, SessionView, Submission};
use crate::debate::{self, DebateOutcome};
use crate::display::render_page;
use crate::models::StoredArticle;

struct Entry {
    session: Arc<Session>,
    last_used: Instant,
}

/// Sessions keyed by client-held id. Each session serializes its own
/// invocations; different sessions run independently.
///
/// The map is bounded: entries idle longer than `idle` are dropped, and
/// when `capacity` is reached the least recently used entry goes, preferring
/// one that no request is currently holding.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Entry>>,
    capacity: usize,
    idle: Duration,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        let server = ServerConfig::default();
        Self::new(server.max_sessions, server.session_idle())
    }
}

impl SessionRegistry {
    pub fn new(capacity: usize, idle: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
            idle,
        }
    }

    pub fn get_or_create(&self, id: &str, pipeline: &Pipeline) -> Arc<Session> {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();

        if let Some(entry) = sessions.get_mut(id) {
            entry.last_used = now;
            return entry.session.clone();
        }

        sessions.retain(|_, e| now.duration_since(e.last_used) < self.idle);
        while sessions.len() >= self.capacity {
            let Some(victim) = least_recently_used(&sessions) else {
                break;
            };
            tracing::debug!(session = %victim, "evicting session");
            sessions.remove(&victim);
        }

        let session = Arc::new(Session::new(pipeline.clone()));
        sessions.insert(
            id.to_string(),
            Entry {
                session: session.clone(),
                last_used: now,
            },
        );
        session
    }

    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn least_recently_used(sessions: &HashMap<String, Entry>) -> Option<String> {
    let oldest = |idle_only: bool| {
        sessions
            .iter()
            .filter(|(_, e)| !idle_only || Arc::strong_count(&e.session) == 1)
            .min_by_key(|(_, e)| e.last_used)
            .map(|(id, _)| id.clone())
    };
    oldest(true).or_else(|| oldest(false))
}

/// A registered session for a client-held id, or a one-off session when
/// the request carries none. One-off sessions are never stored.
fn session_for(state: &AppState, id: Option<&str>) -> Arc<Session> {
    match id {
        Some(id) => state.sessions.get_or_create(id, &state.pipeline),
        None => Arc::new(Session::new(state.pipeline.clone())),
    }
}

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Pipeline,
    pub sessions: Arc<SessionRegistry>,
    pub llm: Option<Arc<dyn CompletionProvider>>,
}

impl AppState {
    pub fn new(pipeline: Pipeline, llm: Option<Arc<dyn CompletionProvider>>) -> Self {
        Self {
            pipeline,
            sessions: Arc::new(SessionRegistry::default()),
            llm,
        }
    }

    pub fn with_sessions(mut self, sessions: SessionRegistry) -> Self {
        self.sessions = Arc::new(sessions);
        self
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_page).post(handle_page_submit))
        .route("/api/search", post(handle_search))
        .route("/api/debate", post(handle_debate))
        .route("/api/articles", get(handle_articles))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until the process is terminated.
pub async fn run_server(bind: &str, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn busy(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::CONFLICT,
        code: "busy",
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: message.into(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET/POST / ============

#[derive(Deserialize)]
struct PageForm {
    #[serde(default)]
    session: String,
    #[serde(default)]
    query: String,
}

async fn handle_page() -> Html<String> {
    let id = uuid::Uuid::new_v4().to_string();
    Html(render_page(&id, &SessionView::default()))
}

async fn handle_page_submit(
    State(state): State<AppState>,
    Form(form): Form<PageForm>,
) -> Result<Html<String>, AppError> {
    let (id, session) = if form.session.trim().is_empty() {
        let id = uuid::Uuid::new_v4().to_string();
        let session = session_for(&state, None);
        (id, session)
    } else {
        let session = session_for(&state, Some(form.session.as_str()));
        (form.session, session)
    };
    let view = match session.submit(&form.query).await {
        Ok(Submission::Completed(inv)) => inv.view,
        Ok(Submission::Ignored) => session.snapshot().unwrap_or_default(),
        Err(e) => return Err(busy(e.to_string())),
    };
    Ok(Html(render_page(&id, &view)))
}

// ============ POST /api/search ============

#[derive(Deserialize)]
struct SearchRequest {
    #[serde(default)]
    session: Option<String>,
    query: String,
}

#[derive(Serialize)]
struct SearchResponse {
    session: String,
    /// Phase the invocation ended in; the session is idle again afterwards.
    terminal: Phase,
    view: SessionView,
}

async fn handle_search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    let client_id = req.session.filter(|s| !s.trim().is_empty());
    let session = session_for(&state, client_id.as_deref());
    let id = client_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    match session.submit(&req.query).await {
        Ok(Submission::Completed(inv)) => Ok(Json(SearchResponse {
            session: id,
            terminal: inv.terminal,
            view: inv.view,
        })),
        Ok(Submission::Ignored) => Err(bad_request("query must not be empty")),
        Err(e) => Err(busy(e.to_string())),
    }
}

// ============ POST /api/debate ============

#[derive(Deserialize)]
struct DebateRequest {
    topic: String,
}

async fn handle_debate(
    State(state): State<AppState>,
    Json(req): Json<DebateRequest>,
) -> Result<Json<DebateOutcome>, AppError> {
    let llm = state.llm.clone().ok_or_else(|| AppError {
        status: StatusCode::BAD_REQUEST,
        code: "llm_disabled",
        message: "no [llm] section configured".to_string(),
    })?;
    if req.topic.trim().is_empty() {
        return Err(bad_request("topic must not be empty"));
    }
    let outcome = debate::generate(
        state.pipeline.search.as_ref(),
        llm.as_ref(),
        &req.topic,
        state.pipeline.max_results,
    )
    .await;
    Ok(Json(outcome))
}

// ============ GET /api/articles ============

#[derive(Deserialize)]
struct ArticlesParams {
    #[serde(default = "default_limit")]
    limit: i64,
}

fn default_limit() -> i64 {
    20
}

#[derive(Serialize)]
struct ArticlesResponse {
    articles: Vec<StoredArticle>,
}

async fn handle_articles(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<ArticlesParams>,
) -> Result<Json<ArticlesResponse>, AppError> {
    if !(1..=500).contains(&params.limit) {
        return Err(bad_request("limit must be in [1, 500]"));
    }
    let articles = state
        .pipeline
        .store
        .recent(params.limit)
        .await
        .map_err(|e| internal(e.to_string()))?;
    Ok(Json(ArticlesResponse { articles }))
}
