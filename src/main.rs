use clap::Parser;
use searxng_tools::cli::{self, Cli};
use searxng_tools::config::CONFIG;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG overrides the default INFO level; logs go to stderr so the
    // one-shot commands keep stdout clean for JSON
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    cli::run(cli, &CONFIG).await
}
