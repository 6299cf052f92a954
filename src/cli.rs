use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;

use crate::api::create_router;
use crate::config::Config;
use crate::fetcher::{DEFAULT_MAX_CHARS, DEFAULT_TIMEOUT_SECS};
use crate::search::DEFAULT_MAX_RESULTS;
use crate::tools::{FetchUrlArgs, OpenSearchResultArgs, SearchArgs, SearchJsonArgs, Tools};

#[derive(Debug, Parser)]
#[command(name = "searxng-tools", version, about = "Web search and page fetch tools backed by SearXNG")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the tools over MCP/SSE and HTTP (default)
    Serve {
        /// Listen address, overrides MOE_SEARXNG_BIND
        #[arg(long)]
        bind: Option<String>,
    },
    /// Print newline-joined result snippets
    Search { query: String },
    /// Print structured search hits as JSON
    SearchJson {
        query: String,
        #[arg(long, default_value_t = DEFAULT_MAX_RESULTS)]
        max_results: usize,
    },
    /// Fetch a URL and print its normalized content as JSON
    Fetch {
        url: String,
        #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
        timeout: u64,
        #[arg(long, default_value_t = DEFAULT_MAX_CHARS)]
        max_chars: usize,
        /// Keep HTML markup instead of extracting text
        #[arg(long)]
        raw: bool,
    },
    /// Search, then fetch the result at --index
    Open {
        query: String,
        #[arg(long, default_value_t = 0)]
        index: usize,
        #[arg(long, default_value_t = DEFAULT_MAX_RESULTS)]
        max_results: usize,
        #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
        timeout: u64,
        #[arg(long, default_value_t = DEFAULT_MAX_CHARS)]
        max_chars: usize,
    },
}

pub async fn run(cli: Cli, config: &Config) -> Result<()> {
    let tools = Tools::from_config(config)?;
    let command = cli.command.unwrap_or(Command::Serve { bind: None });

    let out = match command {
        Command::Serve { bind } => {
            let config = match bind {
                Some(bind) => Config {
                    bind,
                    ..config.clone()
                },
                None => config.clone(),
            };
            return serve(tools, &config).await;
        }
        Command::Search { query } => {
            // legacy output is plain text, not JSON
            println!("{}", tools.search(SearchArgs { query }).await);
            return Ok(());
        }
        Command::SearchJson { query, max_results } => {
            tools
                .search_json(SearchJsonArgs { query, max_results })
                .await
        }
        Command::Fetch {
            url,
            timeout,
            max_chars,
            raw,
        } => {
            tools
                .fetch_url(FetchUrlArgs {
                    url,
                    timeout,
                    max_chars,
                    strip_html: !raw,
                })
                .await
        }
        Command::Open {
            query,
            index,
            max_results,
            timeout,
            max_chars,
        } => {
            tools
                .open_search_result(OpenSearchResultArgs {
                    query,
                    index,
                    max_results,
                    timeout,
                    max_chars,
                })
                .await
        }
    };

    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

async fn serve(tools: Tools, config: &Config) -> Result<()> {
    let addr = config.bind_addr()?;
    let router = create_router(Arc::new(tools));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(
        "serving tools on http://{addr} (MCP SSE at /sse, backend: {})",
        config.searxng_endpoint
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
