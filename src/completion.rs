//! LLM completion through the warehouse's inference endpoint.
//!
//! [`CortexProvider`] calls `POST {base_url}/api/v2/cortex/inference:complete`
//! with a bearer token and a single user message, non-streaming. The reply
//! text is read from `choices[0].message.content`. One attempt per call.
//!
//! The warehouse's single-purpose text functions are provided on top of
//! [`CompletionProvider::complete`] as prompt templates with typed replies:
//!
//! | Method | Reply |
//! |--------|-------|
//! | [`summarize`](CompletionProvider::summarize) | summary text |
//! | [`sentiment`](CompletionProvider::sentiment) | score in `[-1, 1]` |
//! | [`translate`](CompletionProvider::translate) | translated text |
//! | [`extract_answer`](CompletionProvider::extract_answer) | answer text |
//! | [`classify`](CompletionProvider::classify) | one of the given categories |

use async_trait::async_trait;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::CompletionError;

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Model identifier sent with each request.
    fn model_name(&self) -> &str;

    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;

    async fn summarize(&self, text: &str) -> Result<String, CompletionError> {
        let text = require("text", text)?;
        self.complete(&format!(
            "Summarize the following text in a few sentences. \
             Reply with the summary only.\n\nText:\n{text}\n"
        ))
        .await
    }

    /// Sentiment score from -1 (negative) to 1 (positive).
    async fn sentiment(&self, text: &str) -> Result<f64, CompletionError> {
        let text = require("text", text)?;
        let reply = self
            .complete(&format!(
                "Rate the sentiment of the following text as a single number \
                 from -1 (most negative) to 1 (most positive). \
                 Reply with the number only.\n\nText:\n{text}\n"
            ))
            .await?;
        parse_sentiment(&reply)
    }

    /// `from` may be omitted to let the model detect the source language.
    async fn translate(
        &self,
        text: &str,
        from: Option<&str>,
        to: &str,
    ) -> Result<String, CompletionError> {
        let text = require("text", text)?;
        let to = require("target language", to)?;
        let direction = match from.map(str::trim).filter(|f| !f.is_empty()) {
            Some(from) => format!("from {from} to {to}"),
            None => format!("to {to}"),
        };
        self.complete(&format!(
            "Translate the following text {direction}. \
             Reply with the translation only.\n\nText:\n{text}\n"
        ))
        .await
    }

    async fn extract_answer(&self, text: &str, question: &str) -> Result<String, CompletionError> {
        let text = require("text", text)?;
        let question = require("question", question)?;
        self.complete(&format!(
            "Answer the question using only the text below. \
             Reply with the answer only.\n\nText:\n{text}\n\nQuestion: {question}\n"
        ))
        .await
    }

    /// Pick one of `categories` for `text`. The reply is always one of the
    /// given category names, spelled as given.
    async fn classify(&self, text: &str, categories: &[String]) -> Result<String, CompletionError> {
        let text = require("text", text)?;
        let categories: Vec<&str> = categories
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .collect();
        if categories.len() < 2 {
            return Err(CompletionError::InvalidInput(
                "at least two categories are required".to_string(),
            ));
        }
        let reply = self
            .complete(&format!(
                "Classify the following text into exactly one of these categories: {}. \
                 Reply with the category name only.\n\nText:\n{text}\n",
                categories.join(", ")
            ))
            .await?;
        parse_category(&reply, &categories)
    }
}

pub struct CortexProvider {
    client: reqwest::Client,
    url: String,
    token: String,
    model: String,
    timeout: Duration,
}

impl CortexProvider {
    pub fn new(config: &LlmConfig, token: String) -> Result<Self, CompletionError> {
        let timeout = config.timeout();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CompletionError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            url: format!(
                "{}/api/v2/cortex/inference:complete",
                config.base_url.trim_end_matches('/')
            ),
            token,
            model: config.model.clone(),
            timeout,
        })
    }
}

#[async_trait]
impl CompletionProvider for CortexProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        if prompt.trim().is_empty() {
            return Err(CompletionError::EmptyPrompt);
        }

        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "stream": false,
        });

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| CompletionError::from_reqwest(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(CompletionError::Provider {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CompletionError::from_reqwest(e, self.timeout))?;
        parse_completion(&json)
    }
}

fn require<'a>(what: &str, value: &'a str) -> Result<&'a str, CompletionError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CompletionError::InvalidInput(format!("{what} must not be empty")));
    }
    Ok(value)
}

/// First number in the reply, clamped to `[-1, 1]`.
fn parse_sentiment(reply: &str) -> Result<f64, CompletionError> {
    reply
        .split(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | ':'))
        .map(|t| {
            t.trim_matches(|c: char| !(c.is_ascii_digit() || matches!(c, '-' | '+' | '.')))
                .trim_end_matches('.')
        })
        .find_map(|t| t.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .map(|v| v.clamp(-1.0, 1.0))
        .ok_or_else(|| CompletionError::Decode(format!("no sentiment score in reply: {}", reply.trim())))
}

/// Map the reply onto a category: an exact (case-insensitive) answer wins,
/// otherwise the category mentioned first.
fn parse_category(reply: &str, categories: &[&str]) -> Result<String, CompletionError> {
    let answer = reply.trim_matches(|c: char| c.is_whitespace() || c.is_ascii_punctuation());
    if let Some(c) = categories.iter().find(|c| c.eq_ignore_ascii_case(answer)) {
        return Ok(c.to_string());
    }
    let lower = reply.to_lowercase();
    categories
        .iter()
        .filter_map(|c| lower.find(&c.to_lowercase()).map(|pos| (pos, c)))
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, c)| c.to_string())
        .ok_or_else(|| CompletionError::Decode(format!("reply names no category: {}", reply.trim())))
}

/// One warehouse text function, as run from the command line.
#[derive(Debug, Clone)]
pub enum Task {
    Summarize {
        text: String,
    },
    Sentiment {
        text: String,
    },
    Translate {
        text: String,
        from: Option<String>,
        to: String,
    },
    ExtractAnswer {
        text: String,
        question: String,
    },
    Classify {
        text: String,
        categories: Vec<String>,
    },
}

impl Task {
    /// Run the task and render its reply as one line of output.
    pub async fn run(&self, llm: &dyn CompletionProvider) -> Result<String, CompletionError> {
        match self {
            Task::Summarize { text } => llm.summarize(text).await,
            Task::Sentiment { text } => llm.sentiment(text).await.map(|s| format!("{s:.2}")),
            Task::Translate { text, from, to } => llm.translate(text, from.as_deref(), to).await,
            Task::ExtractAnswer { text, question } => llm.extract_answer(text, question).await,
            Task::Classify { text, categories } => llm.classify(text, categories).await,
        }
    }
}

/// Pull the reply text out of a completion response.
fn parse_completion(json: &serde_json::Value) -> Result<String, CompletionError> {
    let choice = json
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .ok_or_else(|| CompletionError::Decode("missing choices array".to_string()))?;

    // Some deployments answer with `messages` (plain string) instead of `message.content`.
    choice
        .get("message")
        .and_then(|m| m.get("content"))
        .or_else(|| choice.get("messages"))
        .and_then(|c| c.as_str())
        .map(|s| s.trim().to_string())
        .ok_or_else(|| CompletionError::Decode("missing message content".to_string()))
}
