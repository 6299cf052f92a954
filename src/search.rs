use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

pub const DEFAULT_MAX_RESULTS: usize = 5;
pub const SEARCH_TIMEOUT: Duration = Duration::from_secs(20);

/// One normalized backend result. `url` is exactly what the backend sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: Option<String>,
    pub url: Option<String>,
    pub engine: Option<String>,
    pub snippet: Option<String>,
}

impl SearchHit {
    fn from_backend(entry: &Value) -> Self {
        let field = |key: &str| entry.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            title: field("title"),
            url: field("url"),
            engine: field("engine"),
            snippet: field("content"),
        }
    }
}

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("search backend returned status {0}")]
    Status(u16),

    #[error("failed to decode search response: {0}")]
    Decode(String),
}

impl SearchError {
    /// The error marker record: `{"error": ..., "status": ...}`.
    pub fn to_marker(&self) -> Value {
        let status = match self {
            SearchError::Status(code) => Some(*code),
            SearchError::Request(e) => e.status().map(|s| s.as_u16()),
            SearchError::Decode(_) => None,
        };
        json!({ "error": self.to_string(), "status": status })
    }
}

/// Client for the SearXNG `/search` JSON endpoint.
#[derive(Debug, Clone)]
pub struct SearchClient {
    client: Client,
    endpoint: String,
}

impl SearchClient {
    pub fn new(client: Client, endpoint: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// First `max_results` hits in backend order.
    pub async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        let url = format!("{}/search", self.endpoint);
        tracing::debug!("searching {url} for {query:?}");

        let res = self
            .client
            .get(&url)
            .query(&[("q", query), ("format", "json")])
            .timeout(SEARCH_TIMEOUT)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            return Err(SearchError::Status(status.as_u16()));
        }

        let body = res.bytes().await?;
        let data: Value =
            serde_json::from_slice(&body).map_err(|e| SearchError::Decode(e.to_string()))?;
        let results = data
            .get("results")
            .and_then(Value::as_array)
            .ok_or_else(|| SearchError::Decode("missing `results` array".to_string()))?;

        Ok(results
            .iter()
            .take(max_results)
            .map(SearchHit::from_backend)
            .collect())
    }

    /// Structured tool output: the hits, or a one-element array holding the
    /// error marker. Never fails.
    pub async fn search_json(&self, query: &str, max_results: usize) -> Value {
        match self.search(query, max_results).await {
            Ok(hits) => json!(hits),
            Err(e) => {
                tracing::warn!("search for {query:?} failed: {e}");
                json!([e.to_marker()])
            }
        }
    }

    /// Legacy plain-text search: every snippet joined with newlines, or the
    /// empty string on any failure. Hits without a snippet are skipped.
    pub async fn search_text(&self, query: &str) -> String {
        match self.search(query, usize::MAX).await {
            Ok(hits) => hits
                .into_iter()
                .filter_map(|hit| hit.snippet)
                .collect::<Vec<String>>()
                .join("\n"),
            Err(e) => {
                tracing::warn!("search for {query:?} failed: {e}");
                String::new()
            }
        }
    }
}
