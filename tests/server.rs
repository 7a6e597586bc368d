//! HTTP surface tests: the real router served on an ephemeral port, backed
//! by the mock provider and an in-memory store.

mod common;

use newsdesk::completion::CortexProvider;
use newsdesk::config::{parse_config, DuplicatePolicy};
use newsdesk::controller::Pipeline;
use newsdesk::server::{router, AppState, SessionRegistry};
use newsdesk::search::ExaProvider;
use newsdesk::store::{ArticleStore, MemoryStore};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use common::{spawn_mock_apis, MockApis, API_KEY, EMPTY_QUERY, LLM_TOKEN};

struct Running {
    base: String,
    store: Arc<MemoryStore>,
    sessions: Arc<SessionRegistry>,
    mock: MockApis,
}

async fn start(with_llm: bool) -> Running {
    start_with(with_llm, SessionRegistry::default()).await
}

async fn start_with(with_llm: bool, registry: SessionRegistry) -> Running {
    let mock = spawn_mock_apis().await;
    let cfg = parse_config(&format!(
        "[search]\nendpoint = \"{}\"\n\n[llm]\nbase_url = \"{}\"\n",
        mock.search_endpoint(),
        mock.base_url()
    ))
    .unwrap();

    let store = Arc::new(MemoryStore::new(DuplicatePolicy::Allow));
    let pipeline = Pipeline {
        search: Arc::new(ExaProvider::new(&cfg.search, API_KEY.to_string()).unwrap()),
        store: store.clone(),
        max_results: 5,
        ingest_timeout: Duration::from_secs(5),
    };
    let llm = if with_llm {
        let llm_cfg = cfg.llm.clone().unwrap();
        Some(Arc::new(CortexProvider::new(&llm_cfg, LLM_TOKEN.to_string()).unwrap())
            as Arc<dyn newsdesk::completion::CompletionProvider>)
    } else {
        None
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = AppState::new(pipeline, llm).with_sessions(registry);
    let sessions = state.sessions.clone();
    let app = router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Running {
        base: format!("http://{}", addr),
        store,
        sessions,
        mock,
    }
}

#[tokio::test]
async fn health_reports_version() {
    let srv = start(false).await;
    let body: Value = reqwest::get(format!("{}/health", srv.base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn api_search_returns_view_and_persists() {
    let srv = start(false).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/search", srv.base))
        .json(&json!({ "session": "s1", "query": "climate change policy" }))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();

    assert_eq!(body["session"], "s1");
    assert_eq!(body["terminal"], "displaying");
    assert_eq!(body["view"]["search"]["status"], "found");
    assert_eq!(body["view"]["search"]["count"], 5);
    assert_eq!(body["view"]["ingest"]["rows_written"], 5);
    assert_eq!(body["view"]["results"].as_array().unwrap().len(), 5);
    assert_eq!(srv.store.count().await.unwrap(), 5);
}

#[tokio::test]
async fn api_search_blank_query_is_bad_request() {
    let srv = start(false).await;
    let resp = reqwest::Client::new()
        .post(format!("{}/api/search", srv.base))
        .json(&json!({ "query": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
    assert_eq!(srv.mock.recorded.search_count(), 0);
}

#[tokio::test]
async fn api_search_no_results_status() {
    let srv = start(false).await;
    let body: Value = reqwest::Client::new()
        .post(format!("{}/api/search", srv.base))
        .json(&json!({ "query": EMPTY_QUERY }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["terminal"], "no_results");
    assert_eq!(body["view"]["search"]["status"], "no_results");
    assert!(body["view"]["ingest"].is_null());
    // A session id is issued when none is sent.
    assert!(!body["session"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn page_form_renders_links() {
    let srv = start(false).await;
    let client = reqwest::Client::new();

    let page = client.get(&srv.base).send().await.unwrap().text().await.unwrap();
    assert!(page.contains("Enter your search query"));

    let html = client
        .post(&srv.base)
        .form(&[("session", "page-1"), ("query", "ocean heat")])
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains("<a href=\"https://news.example/ocean-heat/1\">ocean heat #1</a>"));
    assert!(html.contains("Saved 5 articles"));
}

#[tokio::test]
async fn articles_endpoint_lists_newest_first() {
    let srv = start(false).await;
    let client = reqwest::Client::new();
    client
        .post(format!("{}/api/search", srv.base))
        .json(&json!({ "query": "tides" }))
        .send()
        .await
        .unwrap();

    let body: Value = client
        .get(format!("{}/api/articles?limit=2", srv.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let articles = body["articles"].as_array().unwrap();
    assert_eq!(articles.len(), 2);
    assert_eq!(articles[0]["title"], "tides #5");
}

#[tokio::test]
async fn debate_without_llm_is_rejected() {
    let srv = start(false).await;
    let resp = reqwest::Client::new()
        .post(format!("{}/api/debate", srv.base))
        .json(&json!({ "topic": "school uniforms" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "llm_disabled");
}

#[tokio::test]
async fn debate_generates_both_sides() {
    let srv = start(true).await;
    let body: Value = reqwest::Client::new()
        .post(format!("{}/api/debate", srv.base))
        .json(&json!({ "topic": "school uniforms" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "generated");
    assert_eq!(body["articles"].as_array().unwrap().len(), 5);
    assert!(body["pro"]["text"].as_str().unwrap().contains("Supporters"));
    assert!(body["con"]["text"].as_str().unwrap().contains("Critics"));
    assert_eq!(srv.mock.recorded.completion_count(), 2);
    // Debate results are not persisted.
    assert_eq!(srv.store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn anonymous_searches_are_not_registered() {
    let srv = start(false).await;
    let client = reqwest::Client::new();
    for _ in 0..20 {
        let resp = client
            .post(format!("{}/api/search", srv.base))
            .json(&json!({ "query": EMPTY_QUERY }))
            .send()
            .await
            .unwrap();
        assert!(resp.status().is_success());
    }
    assert!(srv.sessions.is_empty());

    // A client-held id is kept so the next call reuses the same session.
    client
        .post(format!("{}/api/search", srv.base))
        .json(&json!({ "session": "kept", "query": EMPTY_QUERY }))
        .send()
        .await
        .unwrap();
    assert_eq!(srv.sessions.len(), 1);
}

#[tokio::test]
async fn registry_is_capped() {
    let srv = start_with(false, SessionRegistry::new(3, Duration::from_secs(600))).await;
    let client = reqwest::Client::new();
    for i in 0..10 {
        client
            .post(format!("{}/api/search", srv.base))
            .json(&json!({ "session": format!("client-{i}"), "query": EMPTY_QUERY }))
            .send()
            .await
            .unwrap();
    }
    assert_eq!(srv.sessions.len(), 3);
}
