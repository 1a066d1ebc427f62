//! Web search tool using the DuckDuckGo HTML endpoint (no API key needed).

use async_trait::async_trait;
use scout_config::{SearchConfig, WEB_SEARCH_TOOL};
use scout_core::error::ToolError;
use scout_core::tool::{Tool, ToolResult, required_str};
use serde::Serialize;
use tracing::{debug, warn};

/// Returned when the search endpoint cannot be reached.
pub const SEARCH_FALLBACK: &str = "Could not retrieve search results.";

pub struct WebSearchTool {
    client: reqwest::Client,
    base_url: String,
    user_agent: String,
    max_results: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

impl WebSearchTool {
    pub fn new(base_url: impl Into<String>, user_agent: impl Into<String>, max_results: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_agent: user_agent.into(),
            max_results,
        }
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(&config.api_url, &config.user_agent, config.max_results)
    }

    async fn fetch(&self, query: &str) -> Result<String, reqwest::Error> {
        self.client
            .get(format!("{}/html/", self.base_url))
            .query(&[("q", query)])
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        WEB_SEARCH_TOOL
    }

    fn description(&self) -> &str {
        "Search the web for current information. Returns result titles, snippets and URLs."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let query = required_str(&arguments, "query")?;

        let html = match self.fetch(query).await {
            Ok(html) => html,
            Err(e) => {
                warn!(query, error = %e, "Search request failed");
                return Ok(ToolResult::fallback(SEARCH_FALLBACK));
            }
        };

        let hits = extract_results(&html, self.max_results);
        debug!(query, hits = hits.len(), "Search completed");

        if hits.is_empty() {
            return Ok(ToolResult::ok(format!("No results found for: {query}")));
        }

        let output = hits
            .iter()
            .map(|hit| format!("{}\n{}\nURL: {}", hit.title, hit.snippet, hit.url))
            .collect::<Vec<_>>()
            .join("\n\n");

        Ok(ToolResult::ok(output).with_data(serde_json::json!({ "results": hits })))
    }
}

/// Pull result blocks out of a DuckDuckGo HTML page.
pub fn extract_results(html: &str, limit: usize) -> Vec<SearchHit> {
    html.split("result__body\"")
        .skip(1)
        .filter_map(|chunk| {
            let title = field_text(chunk, "result__a")?;
            let snippet = field_text(chunk, "result__snippet").unwrap_or_default();
            let url = field_text(chunk, "result__url").unwrap_or_default();
            Some(SearchHit {
                title,
                snippet,
                url,
            })
        })
        .take(limit)
        .collect()
}

/// Text content of the first element carrying `class`, with inner tags removed.
fn field_text(chunk: &str, class: &str) -> Option<String> {
    let marker = format!("class=\"{class}\"");
    let after = chunk.split(marker.as_str()).nth(1)?;
    let body = &after[after.find('>')? + 1..];
    let end = body.find("</a>").into_iter().chain(body.find("</td>")).min()?;

    let text = html_decode(&strip_tags(&body[..end]));
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}

fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

/// Basic HTML entity decoding.
fn html_decode(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
