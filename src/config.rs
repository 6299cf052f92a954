use dotenvy::dotenv;
use once_cell::sync::Lazy;
use std::env;
use std::net::SocketAddr;

use anyhow::{Context, Result};

pub const ENDPOINT_KEY: &str = "MOE_SEARXNG_ENDPOINT";
pub const USER_AGENT_KEY: &str = "MOE_SEARXNG_USER_AGENT";
pub const BIND_KEY: &str = "MOE_SEARXNG_BIND";

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8080";
pub const DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_BIND: &str = "0.0.0.0:9000";

pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    dotenv().ok(); // Load .env file if present
    Config {
        searxng_endpoint: get_env_or_default(ENDPOINT_KEY, DEFAULT_ENDPOINT),
        user_agent: get_env_or_default(USER_AGENT_KEY, DEFAULT_USER_AGENT),
        bind: get_env_or_default(BIND_KEY, DEFAULT_BIND),
    }
});

/// Process-wide settings, resolved once at start-up and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub searxng_endpoint: String,
    pub user_agent: String,
    pub bind: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            searxng_endpoint: DEFAULT_ENDPOINT.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

impl Config {
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.searxng_endpoint = endpoint.into();
        self
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.bind
            .parse()
            .with_context(|| format!("invalid {BIND_KEY} value: {}", self.bind))
    }
}

fn get_env_or_default(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => default.to_string(),
    }
}
