//! TOML configuration and out-of-band secrets.
//!
//! The config file carries everything that is safe to commit. Credentials
//! (the search API key, the warehouse connection profile, the LLM token) are
//! read from the environment, after loading `.env` if one exists. A missing
//! credential is a [`ConfigError`] raised before any query is accepted.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub warehouse: WarehouseConfig,
    #[serde(default)]
    pub llm: Option<LlmConfig>,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_search_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_num_results")]
    pub num_results: usize,
    #[serde(default = "default_search_type")]
    pub search_type: String,
    #[serde(default = "default_true")]
    pub include_text: bool,
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
            api_key_env: default_search_key_env(),
            num_results: default_num_results(),
            search_type: default_search_type(),
            include_text: true,
            timeout_secs: default_search_timeout(),
        }
    }
}

impl SearchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_search_endpoint() -> String {
    "https://api.exa.ai/search".to_string()
}
fn default_search_key_env() -> String {
    "EXA_API_KEY".to_string()
}
fn default_num_results() -> usize {
    5
}
fn default_search_type() -> String {
    "auto".to_string()
}
fn default_true() -> bool {
    true
}
fn default_search_timeout() -> u64 {
    20
}

/// What to do when a row's url is already stored.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// No uniqueness on url; re-ingesting the same article adds another row.
    #[default]
    Allow,
    /// Unique url; a batch containing a stored url fails as a whole.
    Reject,
    /// Unique url; rows with a stored url are dropped, the rest commit.
    Skip,
}

impl DuplicatePolicy {
    pub fn requires_unique_url(self) -> bool {
        !matches!(self, DuplicatePolicy::Allow)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WarehouseConfig {
    #[serde(default = "default_warehouse_env")]
    pub url_env: String,
    #[serde(default)]
    pub duplicates: DuplicatePolicy,
    #[serde(default = "default_warehouse_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            url_env: default_warehouse_env(),
            duplicates: DuplicatePolicy::default(),
            timeout_secs: default_warehouse_timeout(),
            max_connections: default_max_connections(),
        }
    }
}

impl WarehouseConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_warehouse_env() -> String {
    "NEWSDESK_WAREHOUSE_URL".to_string()
}
fn default_warehouse_timeout() -> u64 {
    30
}
fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    #[serde(default = "default_llm_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_llm_key_env() -> String {
    "SNOWFLAKE_PAT".to_string()
}
fn default_llm_model() -> String {
    "mistral-large2".to_string()
}
fn default_llm_timeout() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Upper bound on sessions kept for client-held ids.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    #[serde(default = "default_session_idle")]
    pub session_idle_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_sessions: default_max_sessions(),
            session_idle_secs: default_session_idle(),
        }
    }
}

impl ServerConfig {
    pub fn session_idle(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }
}

fn default_max_sessions() -> usize {
    1024
}
fn default_session_idle() -> u64 {
    1800
}

fn default_bind() -> String {
    "127.0.0.1:8501".to_string()
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

/// Parse and validate config text.
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;

    if !(1..=100).contains(&config.search.num_results) {
        return Err(ConfigError::Invalid(
            "search.num_results must be in [1, 100]".to_string(),
        ));
    }
    if config.search.timeout_secs == 0 {
        return Err(ConfigError::Invalid(
            "search.timeout_secs must be > 0".to_string(),
        ));
    }
    match config.search.search_type.as_str() {
        "auto" | "neural" | "keyword" | "fast" => {}
        other => {
            return Err(ConfigError::Invalid(format!(
                "Unknown search.search_type: '{}'. Must be auto, neural, keyword, or fast.",
                other
            )))
        }
    }
    if config.warehouse.timeout_secs == 0 {
        return Err(ConfigError::Invalid(
            "warehouse.timeout_secs must be > 0".to_string(),
        ));
    }
    if config.warehouse.max_connections == 0 {
        return Err(ConfigError::Invalid(
            "warehouse.max_connections must be > 0".to_string(),
        ));
    }
    if config.server.max_sessions == 0 || config.server.session_idle_secs == 0 {
        return Err(ConfigError::Invalid(
            "server.max_sessions and server.session_idle_secs must be > 0".to_string(),
        ));
    }
    if let Some(llm) = &config.llm {
        if llm.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("llm.base_url must be set".to_string()));
        }
        if llm.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "llm.timeout_secs must be > 0".to_string(),
            ));
        }
    }

    Ok(config)
}

/// Credentials resolved from the environment.
#[derive(Clone)]
pub struct Secrets {
    pub search_api_key: String,
    pub warehouse_url: String,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("search_api_key", &"<redacted>")
            .field("warehouse_url", &"<redacted>")
            .finish()
    }
}

impl Secrets {
    /// Resolve both pipeline secrets. Loads `.env` first if present.
    pub fn from_env(config: &Config) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Ok(Self {
            search_api_key: search_api_key(config)?,
            warehouse_url: warehouse_url(config)?,
        })
    }
}

pub fn search_api_key(config: &Config) -> Result<String, ConfigError> {
    dotenvy::dotenv().ok();
    require_env("search API key", &config.search.api_key_env)
}

pub fn warehouse_url(config: &Config) -> Result<String, ConfigError> {
    dotenvy::dotenv().ok();
    require_env("warehouse connection profile", &config.warehouse.url_env)
}

/// The LLM section and its token. Only commands that talk to the LLM call this.
pub fn llm_credentials(config: &Config) -> Result<(LlmConfig, String), ConfigError> {
    dotenvy::dotenv().ok();
    let llm = config
        .llm
        .clone()
        .ok_or_else(|| ConfigError::Invalid("[llm] section is required for this command".to_string()))?;
    let token = require_env("LLM access token", &llm.api_key_env)?;
    Ok((llm, token))
}

fn require_env(what: &'static str, env: &str) -> Result<String, ConfigError> {
    match std::env::var(env) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingSecret {
            what,
            env: env.to_string(),
        }),
    }
}
