//! Crawl Orchestrator: one URL → navigate → dismiss interstitial → read
//! markup → extract → persist.

use std::sync::Arc;

use async_trait::async_trait;
use prodcrawl_core::ProductRecord;

use crate::batch::BatchEntry;
use crate::error::CrawlError;
use crate::extract::PageExtractor;
use crate::session::{BrowserSession, SessionFactory, SessionSource};
use crate::sink::ProductSink;

/// Backend-agnostic crawl surface used by the HTTP API and the CLI.
#[async_trait]
pub trait ProductCrawler: Send + Sync {
    /// Crawls a single product page.
    ///
    /// # Errors
    ///
    /// Returns the [`CrawlError`] of whichever stage failed.
    async fn crawl(&self, url: &str) -> Result<ProductRecord, CrawlError>;

    /// Crawls `urls` in order. Per-item failures become error entries; the
    /// output always has one entry per input, in input order.
    ///
    /// # Errors
    ///
    /// Only failures that prevent the batch from starting at all, such as
    /// [`CrawlError::SessionStart`].
    async fn crawl_batch(&self, urls: &[String]) -> Result<Vec<BatchEntry>, CrawlError>;
}

/// Browser-automation crawler.
pub struct BrowserCrawler<F: SessionFactory> {
    pub(crate) factory: F,
    extractor: Arc<PageExtractor>,
    sink: Arc<dyn ProductSink>,
    pub(crate) max_sessions: usize,
}

impl<F: SessionFactory> std::fmt::Debug for BrowserCrawler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowserCrawler")
            .field("max_sessions", &self.max_sessions)
            .finish_non_exhaustive()
    }
}

impl<F: SessionFactory> BrowserCrawler<F> {
    pub fn new(factory: F, extractor: Arc<PageExtractor>, sink: Arc<dyn ProductSink>) -> Self {
        Self {
            factory,
            extractor,
            sink,
            max_sessions: 1,
        }
    }

    /// Allows a batch to run up to `max_sessions` sessions concurrently.
    /// Values below 1 are treated as 1.
    #[must_use]
    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions.max(1);
        self
    }

    /// Crawls `url` using the session named by `source`.
    ///
    /// A launched session is terminated before returning, whether the crawl
    /// succeeded or not. A borrowed session is left running.
    ///
    /// # Errors
    ///
    /// [`CrawlError::SessionStart`] if launching fails, otherwise the error
    /// of whichever stage failed.
    pub async fn crawl_page(
        &self,
        url: &str,
        source: SessionSource<'_, F::Session>,
    ) -> Result<ProductRecord, CrawlError> {
        match source {
            SessionSource::Borrowed(session) => self.crawl_in(session, url).await,
            SessionSource::Launch => {
                let mut session = self.factory.create().await?;
                let result = self.crawl_in(&mut session, url).await;
                session.terminate().await;
                result
            }
        }
    }

    /// One pipeline pass over an already-running session.
    pub(crate) async fn crawl_in(
        &self,
        session: &mut F::Session,
        url: &str,
    ) -> Result<ProductRecord, CrawlError> {
        tracing::info!(url, "crawling");
        session.navigate(url).await?;
        session.dismiss_interstitial().await;
        let markup = session.read_markup().await?;
        let record = self.extractor.extract(&markup, url)?;
        self.sink.persist(&record).await?;
        Ok(record)
    }
}

#[async_trait]
impl<F> ProductCrawler for BrowserCrawler<F>
where
    F: SessionFactory,
{
    async fn crawl(&self, url: &str) -> Result<ProductRecord, CrawlError> {
        self.crawl_page(url, SessionSource::Launch).await
    }

    async fn crawl_batch(&self, urls: &[String]) -> Result<Vec<BatchEntry>, CrawlError> {
        self.run_batch(urls).await
    }
}

#[cfg(test)]
#[path = "crawler_test.rs"]
mod tests;
