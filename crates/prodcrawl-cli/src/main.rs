mod crawl;

use std::num::NonZeroUsize;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "prodcrawl-cli")]
#[command(about = "Crawl product pages into canonical JSON records")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Crawl one product page and print its record.
    Crawl {
        #[command(flatten)]
        backend: BackendArgs,
        url: String,
    },
    /// Crawl several pages in order and print one entry per URL.
    Batch {
        #[command(flatten)]
        backend: BackendArgs,
        /// Concurrent browser sessions (browser backend only).
        #[arg(long)]
        sessions: Option<NonZeroUsize>,
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// List the configured ruleset targets.
    Targets,
}

#[derive(Debug, Clone, Args)]
struct BackendArgs {
    /// Render pages in a browser instead of fetching them over plain HTTP.
    #[arg(long)]
    browser: bool,
    /// Ruleset key; defaults to the configured target for the chosen backend.
    #[arg(long)]
    target: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = prodcrawl_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Crawl { backend, url } => crawl::run_crawl(&config, &backend, &url).await,
        Commands::Batch {
            backend,
            sessions,
            urls,
        } => crawl::run_batch(&config, &backend, sessions, &urls).await,
        Commands::Targets => crawl::list_targets(&config),
    }
}
