//! Plain HTTP fetch path for sites that serve product data without client-side
//! rendering.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use prodcrawl_core::{HttpSettings, ProductRecord};
use reqwest::{Client, StatusCode, Url};

use crate::batch::BatchEntry;
use crate::crawler::ProductCrawler;
use crate::error::CrawlError;
use crate::extract::PageExtractor;
use crate::rate_limit::retry_with_backoff;
use crate::sink::ProductSink;

/// `Retry-After` assumed when a 429 response omits or garbles the header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// GETs pages as text.
///
/// 429 and 5xx responses and network errors are retried with exponential
/// backoff up to `max_retries` additional attempts.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    max_retries: u32,
    backoff_base_secs: u64,
}

impl HttpFetcher {
    /// # Errors
    ///
    /// Returns [`CrawlError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(settings: &HttpSettings) -> Result<Self, CrawlError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(&settings.user_agent)
            .build()?;
        Ok(Self {
            client,
            max_retries: settings.max_retries,
            backoff_base_secs: settings.retry_backoff_base_secs,
        })
    }

    /// Fetches `url` and returns the body.
    ///
    /// # Errors
    ///
    /// - [`CrawlError::RateLimited`]: HTTP 429 after all retries.
    /// - [`CrawlError::UnexpectedStatus`]: any other non-2xx status (5xx after retries).
    /// - [`CrawlError::Http`]: network or TLS failure after all retries.
    pub async fn fetch(&self, url: &str) -> Result<String, CrawlError> {
        retry_with_backoff(self.max_retries, self.backoff_base_secs, || async move {
            let response = self
                .client
                .get(url)
                .header(
                    reqwest::header::ACCEPT,
                    "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8",
                )
                .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
                .send()
                .await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after_secs = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.trim().parse::<u64>().ok())
                    .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
                return Err(CrawlError::RateLimited {
                    domain: domain_of(url),
                    retry_after_secs,
                });
            }
            if !status.is_success() {
                return Err(CrawlError::UnexpectedStatus {
                    status: status.as_u16(),
                    url: url.to_owned(),
                });
            }

            Ok(response.text().await?)
        })
        .await
    }
}

fn domain_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .unwrap_or_else(|| url.to_owned())
}

/// fetch → extract → persist, without a browser.
pub struct HttpCrawler {
    fetcher: HttpFetcher,
    extractor: Arc<PageExtractor>,
    sink: Arc<dyn ProductSink>,
}

impl std::fmt::Debug for HttpCrawler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCrawler")
            .field("fetcher", &self.fetcher)
            .finish_non_exhaustive()
    }
}

impl HttpCrawler {
    pub fn new(
        fetcher: HttpFetcher,
        extractor: Arc<PageExtractor>,
        sink: Arc<dyn ProductSink>,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            sink,
        }
    }
}

#[async_trait]
impl ProductCrawler for HttpCrawler {
    async fn crawl(&self, url: &str) -> Result<ProductRecord, CrawlError> {
        tracing::info!(url, "fetching");
        let markup = self.fetcher.fetch(url).await?;
        let record = self.extractor.extract(&markup, url)?;
        self.sink.persist(&record).await?;
        Ok(record)
    }

    async fn crawl_batch(&self, urls: &[String]) -> Result<Vec<BatchEntry>, CrawlError> {
        let mut entries = Vec::with_capacity(urls.len());
        for url in urls {
            let result = self.crawl(url).await;
            entries.push(BatchEntry::from_result(url, result));
        }
        Ok(entries)
    }
}
