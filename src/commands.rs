//! Command implementations behind the `newsdesk` binary.
//!
//! Every command resolves the secrets it needs before doing anything else,
//! so a missing credential stops the process before a query is accepted.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::completion::{CompletionProvider, CortexProvider, Task};
use crate::config::{self, Config};
use crate::controller::{Pipeline, Session, Submission};
use crate::db;
use crate::debate;
use crate::display::{render_articles_text, render_debate_text, render_text};
use crate::migrate;
use crate::search::ExaProvider;
use crate::server::{self, AppState, SessionRegistry};
use crate::store::{ArticleStore, SqliteStore};

/// Connect to the warehouse and make sure the articles table exists.
async fn open_warehouse(config: &Config, profile: &str) -> Result<SqlitePool> {
    let pool = db::connect(&config.warehouse, profile)
        .await
        .context("Failed to connect to the warehouse")?;
    migrate::run_migrations(&pool, config.warehouse.duplicates)
        .await
        .context("Failed to prepare the articles table")?;
    Ok(pool)
}

/// Wire the search provider and warehouse store from config + environment.
pub async fn build_pipeline(config: &Config) -> Result<Pipeline> {
    let secrets = config::Secrets::from_env(config)?;
    let provider = ExaProvider::new(&config.search, secrets.search_api_key)?;
    let pool = open_warehouse(config, &secrets.warehouse_url).await?;
    let store = SqliteStore::new(pool, config.warehouse.duplicates);

    Ok(Pipeline {
        search: Arc::new(provider),
        store: Arc::new(store),
        max_results: config.search.num_results,
        ingest_timeout: config.warehouse.timeout(),
    })
}

fn build_llm(config: &Config) -> Result<Arc<dyn CompletionProvider>> {
    let (llm, token) = config::llm_credentials(config)?;
    Ok(Arc::new(CortexProvider::new(&llm, token)?))
}

pub async fn run_init(config: &Config) -> Result<()> {
    let pool = open_warehouse(config, &config::warehouse_url(config)?).await?;
    pool.close().await;
    println!("Warehouse initialized successfully.");
    Ok(())
}

/// One invocation of the pipeline from the terminal.
pub async fn run_search(config: &Config, query: &str) -> Result<()> {
    let pipeline = build_pipeline(config).await?;
    let session = Session::new(pipeline);

    match session.submit(query).await? {
        Submission::Ignored => anyhow::bail!("query must not be empty"),
        Submission::Completed(inv) => {
            print!("{}", render_text(&inv.view));
        }
    }
    Ok(())
}

pub async fn run_articles(config: &Config, limit: i64) -> Result<()> {
    let pool = open_warehouse(config, &config::warehouse_url(config)?).await?;
    let store = SqliteStore::new(pool, config.warehouse.duplicates);
    let rows = store.recent(limit).await?;
    print!("{}", render_articles_text(&rows));
    store.pool().close().await;
    Ok(())
}

pub async fn run_complete(config: &Config, prompt: &str) -> Result<()> {
    let llm = build_llm(config)?;
    let answer = llm.complete(prompt).await?;
    println!("{}", answer);
    Ok(())
}

/// One of the warehouse text functions, printed as a single line.
pub async fn run_task(config: &Config, task: Task) -> Result<()> {
    let llm = build_llm(config)?;
    let output = task.run(llm.as_ref()).await?;
    println!("{}", output);
    Ok(())
}

pub async fn run_debate(config: &Config, topic: &str) -> Result<()> {
    let search_key = config::search_api_key(config)?;
    let llm = build_llm(config)?;
    let provider = ExaProvider::new(&config.search, search_key)?;

    let outcome = debate::generate(&provider, llm.as_ref(), topic, config.search.num_results).await;
    print!("{}", render_debate_text(&outcome));
    Ok(())
}

pub async fn run_serve(config: &Config) -> Result<()> {
    let pipeline = build_pipeline(config).await?;
    let llm = match config.llm {
        Some(_) => Some(build_llm(config)?),
        None => None,
    };
    let sessions = SessionRegistry::new(config.server.max_sessions, config.server.session_idle());
    let state = AppState::new(pipeline, llm).with_sessions(sessions);
    server::run_server(&config.server.bind, state).await
}
