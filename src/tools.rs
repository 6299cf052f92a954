use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use thiserror::Error;

use crate::composer::{Composer, OpenOptions};
use crate::config::Config;
use crate::fetcher::{DEFAULT_MAX_CHARS, DEFAULT_TIMEOUT_SECS, FetchOptions, PageFetcher};
use crate::http_client::build_client;
use crate::search::{DEFAULT_MAX_RESULTS, SearchClient};

pub mod names {
    pub const SEARCH: &str = "search";
    pub const SEARCH_JSON: &str = "search_json";
    pub const FETCH_URL: &str = "fetch_url";
    pub const OPEN_SEARCH_RESULT: &str = "open_search_result";
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchArgs {
    pub query: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchJsonArgs {
    pub query: String,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchUrlArgs {
    pub url: String,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_strip_html")]
    pub strip_html: bool,
}

impl FetchUrlArgs {
    pub fn options(&self) -> FetchOptions {
        FetchOptions {
            timeout: Duration::from_secs(self.timeout),
            max_chars: self.max_chars,
            strip_html: self.strip_html,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenSearchResultArgs {
    pub query: String,
    #[serde(default)]
    pub index: usize,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

impl OpenSearchResultArgs {
    pub fn options(&self) -> OpenOptions {
        OpenOptions {
            index: self.index,
            max_results: self.max_results,
            timeout: Duration::from_secs(self.timeout),
            max_chars: self.max_chars,
        }
    }
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_max_chars() -> usize {
    DEFAULT_MAX_CHARS
}

fn default_strip_html() -> bool {
    true
}

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments for {tool}: {source}")]
    InvalidArguments {
        tool: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

/// The callable tool surface. Cheap to share behind an `Arc`; holds no
/// mutable state.
#[derive(Debug, Clone)]
pub struct Tools {
    search: SearchClient,
    fetcher: PageFetcher,
    composer: Composer,
}

impl Tools {
    pub fn new(search: SearchClient, fetcher: PageFetcher) -> Self {
        let composer = Composer::new(search.clone(), fetcher.clone());
        Self {
            search,
            fetcher,
            composer,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let client = build_client(&config.user_agent)?;
        Ok(Self::new(
            SearchClient::new(client.clone(), &config.searxng_endpoint),
            PageFetcher::new(client),
        ))
    }

    pub async fn search(&self, args: SearchArgs) -> String {
        self.search.search_text(&args.query).await
    }

    pub async fn search_json(&self, args: SearchJsonArgs) -> Value {
        self.search.search_json(&args.query, args.max_results).await
    }

    pub async fn fetch_url(&self, args: FetchUrlArgs) -> Value {
        self.fetcher.fetch_json(&args.url, args.options()).await
    }

    pub async fn open_search_result(&self, args: OpenSearchResultArgs) -> Value {
        self.composer
            .open_search_result_json(&args.query, args.options())
            .await
    }

    /// Dispatches a call by tool name with JSON arguments.
    pub async fn call(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        let out = match name {
            names::SEARCH => json!(self.search(parse_args(names::SEARCH, args)?).await),
            names::SEARCH_JSON => self.search_json(parse_args(names::SEARCH_JSON, args)?).await,
            names::FETCH_URL => self.fetch_url(parse_args(names::FETCH_URL, args)?).await,
            names::OPEN_SEARCH_RESULT => {
                self.open_search_result(parse_args(names::OPEN_SEARCH_RESULT, args)?)
                    .await
            }
            other => return Err(ToolError::UnknownTool(other.to_string())),
        };
        Ok(out)
    }
}

fn parse_args<T: DeserializeOwned>(tool: &'static str, args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|source| ToolError::InvalidArguments { tool, source })
}

pub fn descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: names::SEARCH,
            description: "Search the web and return the result snippets joined by newlines. \
                          Returns an empty string if the search fails.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "Search keywords"}
                },
                "required": ["query"]
            }),
        },
        ToolDescriptor {
            name: names::SEARCH_JSON,
            description: "Search the web and return structured hits \
                          (title, url, engine, snippet) in backend order.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "Search keywords"},
                    "max_results": {"type": "integer", "minimum": 0, "default": DEFAULT_MAX_RESULTS}
                },
                "required": ["query"]
            }),
        },
        ToolDescriptor {
            name: names::FETCH_URL,
            description: "Fetch an http(s) URL and return its title and readable text. \
                          Binary content is not expanded.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "url": {"type": "string", "description": "http or https URL"},
                    "timeout": {"type": "integer", "minimum": 0, "default": DEFAULT_TIMEOUT_SECS},
                    "max_chars": {"type": "integer", "minimum": 0, "default": DEFAULT_MAX_CHARS},
                    "strip_html": {"type": "boolean", "default": true}
                },
                "required": ["url"]
            }),
        },
        ToolDescriptor {
            name: names::OPEN_SEARCH_RESULT,
            description: "Search the web, then fetch the result at `index` and return both.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "Search keywords"},
                    "index": {"type": "integer", "minimum": 0, "default": 0},
                    "max_results": {"type": "integer", "minimum": 0, "default": DEFAULT_MAX_RESULTS},
                    "timeout": {"type": "integer", "minimum": 0, "default": DEFAULT_TIMEOUT_SECS},
                    "max_chars": {"type": "integer", "minimum": 0, "default": DEFAULT_MAX_CHARS}
                },
                "required": ["query"]
            }),
        },
    ]
}
