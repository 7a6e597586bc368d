//! Text and HTML rendering of session views and debate outcomes.

use crate::controller::{IngestStatus, SearchStatus, SessionView};
use crate::debate::DebateOutcome;
use crate::models::{Document, StoredArticle};

pub const NO_RESULTS: &str = "No results found.";

/// Markdown-ish lines for the terminal, one per result.
pub fn result_line(doc: &Document) -> String {
    match &doc.url {
        Some(url) => format!("- [{}]({})", doc.title, url),
        None => format!("- {} (URL not available)", doc.title),
    }
}

pub fn render_text(view: &SessionView) -> String {
    let mut out = String::new();
    match &view.search {
        None => return out,
        Some(SearchStatus::Failed { message }) => {
            out.push_str(&format!("An error occurred: {}\n", message));
            return out;
        }
        Some(SearchStatus::NoResults) => {
            out.push_str(NO_RESULTS);
            out.push('\n');
            return out;
        }
        Some(SearchStatus::Found { .. }) => {}
    }

    out.push_str("Search Results:\n");
    for doc in &view.results {
        out.push_str(&result_line(doc));
        out.push('\n');
    }
    if let Some(status) = &view.ingest {
        out.push('\n');
        out.push_str(&ingest_message(status));
        out.push('\n');
    }
    out
}

pub fn ingest_message(status: &IngestStatus) -> String {
    match status {
        IngestStatus::Saved {
            rows_written,
            skipped: 0,
        } => format!("Saved {} articles to the warehouse.", rows_written),
        IngestStatus::Saved {
            rows_written,
            skipped,
        } => format!(
            "Saved {} articles to the warehouse ({} without text skipped).",
            rows_written, skipped
        ),
        IngestStatus::Failed { message } => {
            format!("Could not save articles to the warehouse: {}", message)
        }
    }
}

pub fn render_debate_text(outcome: &DebateOutcome) -> String {
    match outcome {
        DebateOutcome::NoArticles => format!("{}\n", crate::debate::NO_ARTICLES),
        DebateOutcome::SearchFailed { message } => {
            format!("Error during web search: {}\n", message)
        }
        DebateOutcome::Generated {
            articles,
            pro,
            con,
        } => {
            let mut out = String::from("Top Articles:\n");
            for doc in articles {
                out.push_str(&result_line(doc));
                out.push('\n');
            }
            out.push_str("\n### Arguments in Favor:\n");
            out.push_str(pro.text());
            out.push_str("\n\n### Arguments Against:\n");
            out.push_str(con.text());
            out.push('\n');
            out
        }
    }
}

pub fn render_articles_text(rows: &[StoredArticle]) -> String {
    if rows.is_empty() {
        return "No stored articles.\n".to_string();
    }
    let mut out = String::new();
    for row in rows {
        let title = row.title.as_deref().unwrap_or("(untitled)");
        let date = row
            .published_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        match &row.url {
            Some(url) => out.push_str(&format!("{}  {}  {}\n", date, title, url)),
            None => out.push_str(&format!("{}  {}\n", date, title)),
        }
    }
    out
}

// ============ HTML ============

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Provider urls are untrusted: only absolute `http` and `https` urls
/// become links.
fn link_target(raw: &str) -> Option<&str> {
    let url = reqwest::Url::parse(raw).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(raw)
}

/// The search page: one text input, submitted as a form, plus the
/// current session view.
pub fn render_page(session_id: &str, view: &SessionView) -> String {
    let query = view.query.as_deref().unwrap_or("");
    let mut body = String::new();

    match &view.search {
        Some(SearchStatus::Failed { message }) => {
            body.push_str(&format!(
                "<p class=\"error\">An error occurred: {}</p>",
                escape(message)
            ));
        }
        Some(SearchStatus::NoResults) => {
            body.push_str(&format!("<p class=\"warning\">{}</p>", NO_RESULTS));
        }
        Some(SearchStatus::Found { .. }) => {
            body.push_str("<h2>Search Results:</h2><ul>");
            for doc in &view.results {
                match doc.url.as_deref().and_then(link_target) {
                    Some(url) => body.push_str(&format!(
                        "<li><a href=\"{}\">{}</a></li>",
                        escape(url),
                        escape(&doc.title)
                    )),
                    None => body.push_str(&format!(
                        "<li>{} (URL not available)</li>",
                        escape(&doc.title)
                    )),
                }
            }
            body.push_str("</ul>");
            if let Some(status) = &view.ingest {
                let class = match status {
                    IngestStatus::Saved { .. } => "info",
                    IngestStatus::Failed { .. } => "error",
                };
                body.push_str(&format!(
                    "<p class=\"{}\">{}</p>",
                    class,
                    escape(&ingest_message(status))
                ));
            }
        }
        None => {}
    }

    format!(
        r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Web Article Search</title></head>
<body>
<h1>Web Article Search</h1>
<form method="post" action="/">
<input type="hidden" name="session" value="{session}">
<label>Enter your search query: <input type="text" name="query" value="{query}" autofocus></label>
</form>
{body}
</body>
</html>
"#,
        session = escape(session_id),
        query = escape(query),
        body = body
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn found(results: Vec<Document>, ingest: IngestStatus) -> SessionView {
        SessionView {
            query: Some("climate change policy".to_string()),
            search: Some(SearchStatus::Found {
                count: results.len(),
            }),
            ingest: Some(ingest),
            results,
        }
    }

    #[test]
    fn lists_titles_as_links() {
        let view = found(
            vec![
                Document::new("A").with_url("https://a"),
                Document::new("B"),
            ],
            IngestStatus::Saved {
                rows_written: 2,
                skipped: 0,
            },
        );
        let text = render_text(&view);
        assert!(text.contains("- [A](https://a)"));
        assert!(text.contains("- B (URL not available)"));
        assert!(text.contains("Saved 2 articles"));
    }

    #[test]
    fn ingest_failure_still_lists_results() {
        let view = found(
            vec![Document::new("A").with_url("https://a")],
            IngestStatus::Failed {
                message: "UNIQUE constraint failed".to_string(),
            },
        );
        let text = render_text(&view);
        assert!(text.contains("- [A](https://a)"));
        assert!(text.contains("Could not save articles"));
    }

    #[test]
    fn no_results_notice() {
        let view = SessionView {
            query: Some("x".to_string()),
            search: Some(SearchStatus::NoResults),
            ..Default::default()
        };
        assert_eq!(render_text(&view), "No results found.\n");
    }

    #[test]
    fn page_escapes_untrusted_text() {
        let view = found(
            vec![Document::new("<script>").with_url("https://a?b=\"c\"")],
            IngestStatus::Saved {
                rows_written: 1,
                skipped: 0,
            },
        );
        let html = render_page("s1", &view);
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("https://a?b=&quot;c&quot;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn page_links_only_web_urls() {
        let view = found(
            vec![
                Document::new("click me").with_url("javascript:alert(document.cookie)"),
                Document::new("inline").with_url("data:text/html,<b>hi</b>"),
                Document::new("relative").with_url("/etc/passwd"),
                Document::new("web").with_url("https://news.example/a"),
            ],
            IngestStatus::Saved {
                rows_written: 4,
                skipped: 0,
            },
        );
        let html = render_page("s1", &view);
        assert!(!html.contains("javascript:"));
        assert!(!html.contains("href=\"data:"));
        assert!(html.contains("<li>click me (URL not available)</li>"));
        assert!(html.contains("<li>inline (URL not available)</li>"));
        assert!(html.contains("<li>relative (URL not available)</li>"));
        assert!(html.contains("<a href=\"https://news.example/a\">web</a>"));
    }
}
