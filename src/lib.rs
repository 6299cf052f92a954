pub mod api;
pub mod cli;
pub mod composer;
pub mod config;
pub mod fetcher;
pub mod http_client;
pub mod mcp;
pub mod normalizer;
pub mod search;
pub mod tools;
pub mod url_guard;
