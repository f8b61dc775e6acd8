pub mod batch;
pub mod client;
pub mod crawler;
pub mod error;
pub mod extract;
mod images;
mod rate_limit;
pub mod session;
pub mod sink;

pub use batch::{BatchEntry, BatchFailure, CRAWL_FAILED};
pub use client::{HttpCrawler, HttpFetcher};
pub use crawler::{BrowserCrawler, ProductCrawler};
pub use error::CrawlError;
pub use extract::PageExtractor;
pub use session::{
    BrowserSession, ChromiumLauncher, ChromiumSession, SessionFactory, SessionSource, SessionState,
};
pub use sink::{JsonFileSink, ProductSink};

use prodcrawl_core::RulesetRegistry;

/// Compiles the ruleset registered under `target`.
///
/// # Errors
///
/// - [`CrawlError::UnknownTarget`] if no ruleset is registered for `target`.
/// - [`CrawlError::InvalidSelector`] / [`CrawlError::InvalidPattern`] if it does not compile.
pub fn extractor_for(registry: &RulesetRegistry, target: &str) -> Result<PageExtractor, CrawlError> {
    let ruleset = registry
        .get(target)
        .ok_or_else(|| CrawlError::UnknownTarget(target.to_owned()))?;
    PageExtractor::new(ruleset)
}
