//! Shared fixtures: an in-process stand-in for the hosted search and
//! completion APIs.

#![allow(dead_code)]

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const API_KEY: &str = "test-key";
pub const LLM_TOKEN: &str = "test-pat";
pub const EMPTY_QUERY: &str = "asdkjqwpoiuoiu12309";
pub const SLOW_QUERY: &str = "slow network please";

#[derive(Clone, Default)]
pub struct Recorded {
    pub searches: Arc<Mutex<Vec<Value>>>,
    pub completions: Arc<Mutex<Vec<Value>>>,
}

impl Recorded {
    pub fn search_count(&self) -> usize {
        self.searches.lock().unwrap().len()
    }

    pub fn last_search(&self) -> Value {
        self.searches.lock().unwrap().last().cloned().unwrap()
    }

    pub fn completion_count(&self) -> usize {
        self.completions.lock().unwrap().len()
    }
}

pub struct MockApis {
    pub addr: SocketAddr,
    pub recorded: Recorded,
}

impl MockApis {
    pub fn search_endpoint(&self) -> String {
        format!("http://{}/search", self.addr)
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

/// Five results per query, titled "<query> #1" .. "<query> #5", each with
/// a url, text, and published date.
pub fn articles_for(query: &str) -> Value {
    let results: Vec<Value> = (1..=5)
        .map(|i| {
            json!({
                "id": format!("doc-{i}"),
                "title": format!("{query} #{i}"),
                "url": format!("https://news.example/{}/{i}", query.replace(' ', "-")),
                "text": format!("Full text of article {i} about {query}."),
                "publishedDate": format!("2024-0{i}-15T09:30:00.000Z"),
                "author": "Staff",
                "score": 1.0 / i as f64,
            })
        })
        .collect();
    json!({ "requestId": "req-1", "results": results })
}

async fn search_handler(
    State(recorded): State<Recorded>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if headers.get("x-api-key").and_then(|v| v.to_str().ok()) != Some(API_KEY) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "invalid api key" })),
        );
    }
    recorded.searches.lock().unwrap().push(body.clone());

    let query = body["query"].as_str().unwrap_or_default().to_string();
    match query.as_str() {
        EMPTY_QUERY => (StatusCode::OK, Json(json!({ "results": [] }))),
        SLOW_QUERY => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            (StatusCode::OK, Json(articles_for(&query)))
        }
        _ => (StatusCode::OK, Json(articles_for(&query))),
    }
}

async fn completion_handler(
    State(recorded): State<Recorded>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let expected = format!("Bearer {}", LLM_TOKEN);
    if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some(expected.as_str()) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "message": "bad token" })));
    }
    recorded.completions.lock().unwrap().push(body.clone());

    let prompt = body["messages"][0]["content"].as_str().unwrap_or_default();
    let answer = if prompt.contains("Position: PRO") {
        "1. Supporters point to the linked coverage."
    } else if prompt.contains("Position: CON") {
        "1. Critics point to the linked coverage."
    } else if prompt.starts_with("Rate the sentiment") {
        "0.92"
    } else if prompt.starts_with("Classify the following text") {
        "Europe"
    } else if prompt.starts_with("Answer the question") {
        "2012"
    } else {
        "Snowflakes get their patterns from how ice crystals grow."
    };
    (
        StatusCode::OK,
        Json(json!({ "choices": [{ "message": { "content": answer } }] })),
    )
}

pub async fn spawn_mock_apis() -> MockApis {
    let recorded = Recorded::default();
    let app = Router::new()
        .route("/search", post(search_handler))
        .route("/api/v2/cortex/inference:complete", post(completion_handler))
        .with_state(recorded.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockApis { addr, recorded }
}
