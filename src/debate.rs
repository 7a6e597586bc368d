//! Debate generator: search articles for a topic, then ask the LLM for the
//! case for and against it.
//!
//! Articles found here are shown but not persisted. A failed completion for
//! one side does not affect the other side.

use serde::Serialize;

use crate::completion::CompletionProvider;
use crate::models::Document;
use crate::search::{search, SearchProvider};

pub const NO_ARTICLES: &str = "No articles found. Try a different topic.";
pub const NO_ARGUMENTS: &str = "No arguments generated.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Pro,
    Con,
}

impl Position {
    fn label(self) -> &'static str {
        match self {
            Position::Pro => "PRO",
            Position::Con => "CON",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Arguments {
    Generated { text: String },
    Unavailable { message: String },
}

impl Arguments {
    /// The argument text, or the fallback notice.
    pub fn text(&self) -> &str {
        match self {
            Arguments::Generated { text } if !text.trim().is_empty() => text.as_str(),
            _ => NO_ARGUMENTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DebateOutcome {
    NoArticles,
    SearchFailed {
        message: String,
    },
    Generated {
        articles: Vec<Document>,
        pro: Arguments,
        con: Arguments,
    },
}

/// Build the prompt for one side. Articles without a url are left out of
/// the context list.
pub fn build_prompt(topic: &str, position: Position, articles: &[Document]) -> String {
    let context: Vec<String> = articles
        .iter()
        .filter_map(|a| a.url.as_ref().map(|url| format!("- {} ({})", a.title, url)))
        .collect();

    format!(
        "You are an AI assistant that generates arguments for a debate. Below are some \
         articles related to a topic. Create a detailed and succinct argument for the \
         given position on the topic.\n\n\
         Topic: \"{topic}\"\n\n\
         Position: {position}\n\n\
         Articles:\n{articles}\n\n\
         Provide your arguments below, formatted as concise and impactful points:\n",
        topic = topic.trim(),
        position = position.label(),
        articles = context.join("\n"),
    )
}

pub async fn generate(
    search_provider: &dyn SearchProvider,
    llm: &dyn CompletionProvider,
    topic: &str,
    max_results: usize,
) -> DebateOutcome {
    let articles = match search(search_provider, topic, max_results).await {
        Ok(a) => a,
        Err(e) => {
            return DebateOutcome::SearchFailed {
                message: e.to_string(),
            }
        }
    };
    if articles.is_empty() {
        return DebateOutcome::NoArticles;
    }

    let pro = argue(llm, topic, Position::Pro, &articles).await;
    let con = argue(llm, topic, Position::Con, &articles).await;

    DebateOutcome::Generated { articles, pro, con }
}

async fn argue(
    llm: &dyn CompletionProvider,
    topic: &str,
    position: Position,
    articles: &[Document],
) -> Arguments {
    let prompt = build_prompt(topic, position, articles);
    match llm.complete(&prompt).await {
        Ok(text) => Arguments::Generated { text },
        Err(e) => {
            tracing::warn!(
                model = llm.model_name(),
                position = position.label(),
                error = %e,
                "completion failed"
            );
            Arguments::Unavailable {
                message: e.to_string(),
            }
        }
    }
}
