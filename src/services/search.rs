//! Web search.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Result, ThreadlineError};
use crate::provider::http::{shared_client, status_to_error};

pub const DEFAULT_SEARCH_URL: &str = "https://api.duckduckgo.com";

/// Returns a plain-text digest of results for a query.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    async fn search(&self, query: &str) -> Result<String>;
}

/// DuckDuckGo Instant Answer API client.
#[derive(Debug, Clone)]
pub struct DuckDuckGoSearch {
    base_url: String,
}

impl Default for DuckDuckGoSearch {
    fn default() -> Self {
        Self::new(None)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstantAnswer {
    #[serde(default)]
    abstract_text: String,
    #[serde(default)]
    related_topics: Vec<RelatedTopic>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RelatedTopic {
    #[serde(default)]
    text: Option<String>,
}

impl DuckDuckGoSearch {
    pub fn new(base_url: Option<String>) -> Self {
        let base_url = base_url.unwrap_or_else(|| DEFAULT_SEARCH_URL.to_string());
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SearchEngine for DuckDuckGoSearch {
    async fn search(&self, query: &str) -> Result<String> {
        debug!(query, "web search");
        let resp = shared_client()
            .get(format!("{}/", self.base_url))
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await?;

        let status = resp.status().as_u16();
        let body = resp.text().await?;
        if status != 200 {
            return Err(status_to_error(status, &body));
        }
        let answer: InstantAnswer = serde_json::from_str(&body)?;
        digest(&answer).ok_or_else(|| ThreadlineError::tool("search_summary", "no search results"))
    }
}

fn digest(answer: &InstantAnswer) -> Option<String> {
    let mut lines = Vec::new();
    if !answer.abstract_text.trim().is_empty() {
        lines.push(answer.abstract_text.trim().to_string());
    }
    lines.extend(
        answer
            .related_topics
            .iter()
            .filter_map(|t| t.text.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string),
    );
    (!lines.is_empty()).then(|| lines.join("\n"))
}
