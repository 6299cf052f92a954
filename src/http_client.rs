use anyhow::{Context, Result};
use reqwest::Client;
use reqwest::redirect::Policy;

const MAX_REDIRECTS: usize = 10;

/// Builds the single outbound client shared by every tool.
///
/// Clones of the returned client share one connection pool. There is no
/// retry layer: each logical call makes exactly one attempt and the caller
/// interprets the failure. Timeouts are set per request.
pub fn build_client(user_agent: &str) -> Result<Client> {
    Client::builder()
        .user_agent(user_agent)
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .deflate(true)
        .build()
        .context("Failed to build HTTP client")
}
