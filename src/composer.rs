use std::time::Duration;

use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

use crate::fetcher::{DEFAULT_MAX_CHARS, DEFAULT_TIMEOUT_SECS, FetchOptions, PageFetcher};
use crate::search::{DEFAULT_MAX_RESULTS, SearchClient, SearchHit};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenOptions {
    pub index: usize,
    pub max_results: usize,
    pub timeout: Duration,
    pub max_chars: usize,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            index: 0,
            max_results: DEFAULT_MAX_RESULTS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_chars: DEFAULT_MAX_CHARS,
        }
    }
}

/// `page` holds either the fetched page or the fetcher's `{error, url}` record.
#[derive(Debug, Clone, Serialize)]
pub struct ComposedResult {
    pub query: String,
    pub picked: SearchHit,
    pub page: Value,
}

#[derive(Error, Debug)]
pub enum ComposeError {
    /// Carries the `search_json` output that made the search unusable.
    #[error("search failed")]
    SearchFailed { details: Value },

    #[error("index out of range (0..{})", .len.saturating_sub(1))]
    IndexOutOfRange { len: usize },
}

impl ComposeError {
    pub fn to_record(&self) -> Value {
        match self {
            ComposeError::SearchFailed { details } => {
                json!({ "error": self.to_string(), "details": details })
            }
            ComposeError::IndexOutOfRange { .. } => json!({ "error": self.to_string() }),
        }
    }
}

/// Search, then open one of the hits.
#[derive(Debug, Clone)]
pub struct Composer {
    search: SearchClient,
    fetcher: PageFetcher,
}

impl Composer {
    pub fn new(search: SearchClient, fetcher: PageFetcher) -> Self {
        Self { search, fetcher }
    }

    pub async fn open_search_result(
        &self,
        query: &str,
        opts: OpenOptions,
    ) -> Result<ComposedResult, ComposeError> {
        let mut hits = match self.search.search(query, opts.max_results).await {
            Ok(hits) if !hits.is_empty() => hits,
            Ok(hits) => {
                return Err(ComposeError::SearchFailed {
                    details: json!(hits),
                });
            }
            Err(e) => {
                tracing::warn!("search for {query:?} failed: {e}");
                return Err(ComposeError::SearchFailed {
                    details: json!([e.to_marker()]),
                });
            }
        };

        if opts.index >= hits.len() {
            return Err(ComposeError::IndexOutOfRange { len: hits.len() });
        }
        let picked = hits.swap_remove(opts.index);

        // a hit without a url is fetched as "" and rejected by the guard
        let url = picked.url.as_deref().unwrap_or_default();
        let fetch_opts = FetchOptions {
            timeout: opts.timeout,
            max_chars: opts.max_chars,
            strip_html: true,
        };
        let page = self.fetcher.fetch_json(url, fetch_opts).await;

        Ok(ComposedResult {
            query: query.to_string(),
            picked,
            page,
        })
    }

    /// Tool output: the composed result or an error record.
    pub async fn open_search_result_json(&self, query: &str, opts: OpenOptions) -> Value {
        match self.open_search_result(query, opts).await {
            Ok(composed) => json!(composed),
            Err(e) => e.to_record(),
        }
    }
}
