use std::time::Duration;

use encoding_rs::Encoding;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

use crate::normalizer::{self, ContentKind, Extracted};
use crate::url_guard;

pub const DEFAULT_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_MAX_CHARS: usize = 60_000;
pub const BINARY_NOTE: &str = "non-text or binary content; not expanded";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub max_chars: usize,
    pub strip_html: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_chars: DEFAULT_MAX_CHARS,
            strip_html: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchResult {
    pub requested_url: String,
    pub final_url: String,
    pub status: u16,
    pub content_type: String,
    pub encoding: String,
    pub title: String,
    pub text: String,
    pub truncated: bool,
    pub note: String,
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("only http and https URLs can be fetched")]
    Rejected { url: String },

    #[error("request failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    pub fn url(&self) -> &str {
        match self {
            FetchError::Rejected { url } | FetchError::Request { url, .. } => url,
        }
    }

    /// `{"error": ..., "url": ...}`
    pub fn to_record(&self) -> Value {
        json!({ "error": self.to_string(), "url": self.url() })
    }
}

/// Fetches one page and normalizes its content.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn fetch(&self, url: &str, opts: FetchOptions) -> Result<FetchResult, FetchError> {
        if !url_guard::is_fetchable(url) {
            return Err(FetchError::Rejected {
                url: url.to_string(),
            });
        }

        let request_failed = |source: reqwest::Error| FetchError::Request {
            url: url.to_string(),
            source,
        };

        tracing::debug!("fetching {url}");
        let res = self
            .client
            .get(url.trim())
            .timeout(opts.timeout)
            .send()
            .await
            .map_err(request_failed)?;

        let status = res.status().as_u16();
        let final_url = res.url().to_string();
        let content_type = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let kind = ContentKind::classify(&content_type);

        if !kind.is_expandable() {
            // the body is dropped unread
            let encoding = normalizer::detect_encoding(&content_type, &[], kind);
            return Ok(FetchResult {
                requested_url: url.to_string(),
                final_url,
                status,
                content_type,
                encoding: normalizer::encoding_label(encoding),
                title: String::new(),
                text: String::new(),
                truncated: false,
                note: BINARY_NOTE.to_string(),
            });
        }

        let body = res.bytes().await.map_err(request_failed)?;
        let (encoding, extracted) =
            normalize_off_thread(&content_type, body, kind, opts.strip_html).await;
        let (text, truncated) = normalizer::truncate_chars(extracted.text, opts.max_chars);

        Ok(FetchResult {
            requested_url: url.to_string(),
            final_url,
            status,
            content_type,
            encoding: normalizer::encoding_label(encoding),
            title: extracted.title,
            text,
            truncated,
            note: String::new(),
        })
    }

    /// Tool output: the serialized [`FetchResult`] or the `{error, url}` record.
    pub async fn fetch_json(&self, url: &str, opts: FetchOptions) -> Value {
        match self.fetch(url, opts).await {
            Ok(page) => json!(page),
            Err(e) => {
                tracing::warn!("fetch of {url:?} failed: {e}");
                e.to_record()
            }
        }
    }
}

/// Parsing large pages is CPU work, so it runs on the blocking pool. If that
/// task dies the body is passed through unextracted.
async fn normalize_off_thread<B>(
    content_type: &str,
    body: B,
    kind: ContentKind,
    strip_html: bool,
) -> (&'static Encoding, Extracted)
where
    B: AsRef<[u8]> + Clone + Send + 'static,
{
    let content_type_owned = content_type.to_string();
    let raw = body.clone();
    let task = tokio::task::spawn_blocking(move || {
        normalizer::normalize(&content_type_owned, body.as_ref(), kind, strip_html)
    });
    match task.await {
        Ok(normalized) => normalized,
        Err(e) => {
            tracing::warn!("content extraction task failed: {e}");
            normalizer::normalize(content_type, raw.as_ref(), kind, false)
        }
    }
}
