mod api;
mod middleware;

use std::sync::Arc;

use prodcrawl_core::{builtin_registry, load_rulesets, AppConfig, RulesetRegistry};
use prodcrawl_scraper::{
    extractor_for, BrowserCrawler, ChromiumLauncher, HttpCrawler, HttpFetcher, JsonFileSink,
    ProductSink,
};
use tracing_subscriber::EnvFilter;

use crate::api::{build_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = prodcrawl_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let state = build_state(&config)?;
    let app = build_app(state);

    tracing::info!(
        addr = %config.bind_addr,
        env = %config.env,
        http_target = %config.http_target,
        browser_target = %config.browser_target,
        output_dir = %config.output_dir.display(),
        "prodcrawl-server listening"
    );
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn load_registry(config: &AppConfig) -> anyhow::Result<RulesetRegistry> {
    let registry = match &config.rulesets_path {
        Some(path) => load_rulesets(path)?,
        None => builtin_registry(),
    };
    tracing::info!(
        targets = ?registry.targets().collect::<Vec<_>>(),
        "rulesets loaded"
    );
    Ok(registry)
}

fn build_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let registry = load_registry(config)?;
    let sink: Arc<dyn ProductSink> = Arc::new(JsonFileSink::new(&config.output_dir));

    let http = HttpCrawler::new(
        HttpFetcher::new(&config.http)?,
        Arc::new(extractor_for(&registry, &config.http_target)?),
        Arc::clone(&sink),
    );
    let browser = BrowserCrawler::new(
        ChromiumLauncher::new(config.browser.clone()),
        Arc::new(extractor_for(&registry, &config.browser_target)?),
        sink,
    )
    .with_max_sessions(config.batch_max_sessions);

    Ok(AppState {
        http: Arc::new(http),
        browser: Arc::new(browser),
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
