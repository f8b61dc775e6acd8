use std::num::NonZeroUsize;
use std::sync::Arc;

use prodcrawl_core::{builtin_registry, load_rulesets, AppConfig, RulesetRegistry};
use prodcrawl_scraper::{
    extractor_for, BrowserCrawler, ChromiumLauncher, HttpCrawler, HttpFetcher, JsonFileSink,
    ProductCrawler, ProductSink,
};

use crate::BackendArgs;

fn load_registry(config: &AppConfig) -> anyhow::Result<RulesetRegistry> {
    Ok(match &config.rulesets_path {
        Some(path) => load_rulesets(path)?,
        None => builtin_registry(),
    })
}

/// Ruleset key for `backend`: the explicit `--target`, else the configured
/// default for the chosen backend.
pub(crate) fn resolve_target<'a>(config: &'a AppConfig, backend: &'a BackendArgs) -> &'a str {
    match (&backend.target, backend.browser) {
        (Some(target), _) => target,
        (None, true) => &config.browser_target,
        (None, false) => &config.http_target,
    }
}

fn build_crawler(
    config: &AppConfig,
    backend: &BackendArgs,
    sessions: Option<NonZeroUsize>,
) -> anyhow::Result<Box<dyn ProductCrawler>> {
    let registry = load_registry(config)?;
    let target = resolve_target(config, backend);
    let extractor = Arc::new(extractor_for(&registry, target)?);
    let sink: Arc<dyn ProductSink> = Arc::new(JsonFileSink::new(&config.output_dir));
    tracing::debug!(target, browser = backend.browser, "crawler configured");

    if backend.browser {
        let max_sessions = sessions.map_or(config.batch_max_sessions, NonZeroUsize::get);
        Ok(Box::new(
            BrowserCrawler::new(ChromiumLauncher::new(config.browser.clone()), extractor, sink)
                .with_max_sessions(max_sessions),
        ))
    } else {
        if sessions.is_some() {
            tracing::warn!("--sessions only applies to the browser backend; ignoring");
        }
        Ok(Box::new(HttpCrawler::new(
            HttpFetcher::new(&config.http)?,
            extractor,
            sink,
        )))
    }
}

pub(crate) async fn run_crawl(
    config: &AppConfig,
    backend: &BackendArgs,
    url: &str,
) -> anyhow::Result<()> {
    let crawler = build_crawler(config, backend, None)?;
    let record = crawler.crawl(url).await?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

pub(crate) async fn run_batch(
    config: &AppConfig,
    backend: &BackendArgs,
    sessions: Option<NonZeroUsize>,
    urls: &[String],
) -> anyhow::Result<()> {
    let crawler = build_crawler(config, backend, sessions)?;
    let entries = crawler.crawl_batch(urls).await?;
    let failed = entries.iter().filter(|e| e.is_failure()).count();
    println!("{}", serde_json::to_string_pretty(&entries)?);
    tracing::info!(total = entries.len(), failed, "batch finished");
    Ok(())
}

pub(crate) fn list_targets(config: &AppConfig) -> anyhow::Result<()> {
    let registry = load_registry(config)?;
    for target in registry.targets() {
        println!("{target}");
    }
    Ok(())
}
