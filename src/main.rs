//! # newsdesk CLI
//!
//! ```bash
//! newsdesk --config ./config/newsdesk.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `newsdesk init` | Create the warehouse `articles` table |
//! | `newsdesk search "<query>"` | Search, store results, print them |
//! | `newsdesk articles` | List recently stored articles |
//! | `newsdesk complete "<prompt>"` | One-shot LLM completion |
//! | `newsdesk summarize "<text>"` | Summarize text |
//! | `newsdesk sentiment "<text>"` | Sentiment score in [-1, 1] |
//! | `newsdesk translate "<text>" --to fr` | Translate text |
//! | `newsdesk extract "<text>" --question "<q>"` | Answer a question from text |
//! | `newsdesk classify "<text>" --category A --category B` | Pick a category |
//! | `newsdesk debate "<topic>"` | Pro/con arguments from web articles |
//! | `newsdesk serve` | Start the search page and JSON API |
//!
//! Secrets come from the environment (or `.env`): the search API key, the
//! warehouse connection profile and, for the LLM commands, the LLM token.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use newsdesk::completion::Task;
use newsdesk::{commands, config};

#[derive(Parser)]
#[command(
    name = "newsdesk",
    about = "Search the web for articles and land them in the warehouse",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/newsdesk.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the warehouse table. Idempotent.
    Init,

    /// Search the web, store the results, and print them.
    Search {
        /// Free-text query.
        query: String,
    },

    /// List the most recently stored articles.
    Articles {
        /// Number of rows to show (1-500).
        #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(i64).range(1..=500))]
        limit: i64,
    },

    /// Ask the warehouse LLM a single question.
    Complete {
        prompt: String,
    },

    /// Summarize a piece of text.
    Summarize {
        text: String,
    },

    /// Score the sentiment of a piece of text from -1 to 1.
    Sentiment {
        text: String,
    },

    /// Translate a piece of text.
    Translate {
        text: String,
        /// Source language; detected when omitted.
        #[arg(long)]
        from: Option<String>,
        /// Target language, e.g. `fr`.
        #[arg(long)]
        to: String,
    },

    /// Answer a question using only the given text.
    Extract {
        text: String,
        #[arg(long)]
        question: String,
    },

    /// Assign a piece of text to one of the given categories.
    Classify {
        text: String,
        /// Repeat for each category (at least two).
        #[arg(long = "category", required = true)]
        categories: Vec<String>,
    },

    /// Generate arguments for and against a topic from web articles.
    Debate {
        topic: String,
    },

    /// Start the HTTP search page and JSON API.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("newsdesk=info")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => commands::run_init(&cfg).await?,
        Commands::Search { query } => commands::run_search(&cfg, &query).await?,
        Commands::Articles { limit } => commands::run_articles(&cfg, limit).await?,
        Commands::Complete { prompt } => commands::run_complete(&cfg, &prompt).await?,
        Commands::Summarize { text } => commands::run_task(&cfg, Task::Summarize { text }).await?,
        Commands::Sentiment { text } => commands::run_task(&cfg, Task::Sentiment { text }).await?,
        Commands::Translate { text, from, to } => {
            commands::run_task(&cfg, Task::Translate { text, from, to }).await?
        }
        Commands::Extract { text, question } => {
            commands::run_task(&cfg, Task::ExtractAnswer { text, question }).await?
        }
        Commands::Classify { text, categories } => {
            commands::run_task(&cfg, Task::Classify { text, categories }).await?
        }
        Commands::Debate { topic } => commands::run_debate(&cfg, &topic).await?,
        Commands::Serve => commands::run_serve(&cfg).await?,
    }

    Ok(())
}
