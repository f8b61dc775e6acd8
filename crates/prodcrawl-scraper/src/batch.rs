//! Batch Driver: many URLs, failure-isolated, order-preserving.

use futures::future::join_all;
use prodcrawl_core::ProductRecord;
use serde::{Deserialize, Serialize};

use crate::crawler::BrowserCrawler;
use crate::error::CrawlError;
use crate::session::{BrowserSession, SessionFactory};

/// Literal `error` value carried by every failed batch entry.
pub const CRAWL_FAILED: &str = "Crawl Failed";

/// One slot of a batch result. Serialized untagged: a success is a bare
/// [`ProductRecord`], a failure is a [`BatchFailure`] object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchEntry {
    // Failure first so untagged deserialization does not read a failure
    // object as a mostly-empty record.
    Failed(BatchFailure),
    Product(ProductRecord),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFailure {
    /// Always [`CRAWL_FAILED`].
    pub error: String,
    pub detail: String,
    pub url: String,
    /// Machine-readable [`CrawlError::code`].
    pub code: String,
}

impl BatchEntry {
    #[must_use]
    pub fn failed(url: &str, err: &CrawlError) -> Self {
        BatchEntry::Failed(BatchFailure {
            error: CRAWL_FAILED.to_owned(),
            detail: err.to_string(),
            url: url.to_owned(),
            code: err.code().to_owned(),
        })
    }

    /// Converts a per-item result, logging failures.
    #[must_use]
    pub fn from_result(url: &str, result: Result<ProductRecord, CrawlError>) -> Self {
        match result {
            Ok(record) => BatchEntry::Product(record),
            Err(e) => {
                tracing::warn!(url, error = %e, code = e.code(), "batch item failed");
                BatchEntry::failed(url, &e)
            }
        }
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, BatchEntry::Failed(_))
    }
}

impl<F: SessionFactory> BrowserCrawler<F> {
    /// Runs a batch, sequentially over one session or, when
    /// `max_sessions > 1`, over contiguous partitions each with its own
    /// session. Every session created here is terminated before returning.
    ///
    /// An empty batch still launches (and terminates) one session.
    pub(crate) async fn run_batch(&self, urls: &[String]) -> Result<Vec<BatchEntry>, CrawlError> {
        if self.max_sessions <= 1 || urls.len() <= 1 {
            let mut session = self.factory.create().await?;
            let entries = self.run_partition(&mut session, urls).await;
            session.terminate().await;
            return Ok(entries);
        }

        let chunk_size = urls.len().div_ceil(self.max_sessions);
        let partitions: Vec<&[String]> = urls.chunks(chunk_size).collect();
        let mut sessions = self.launch_all(partitions.len()).await?;
        tracing::info!(
            urls = urls.len(),
            sessions = sessions.len(),
            "running pooled batch"
        );

        let work = sessions
            .iter_mut()
            .zip(partitions)
            .map(|(session, part)| self.run_partition(session, part));
        let results = join_all(work).await;

        for session in &mut sessions {
            session.terminate().await;
        }
        Ok(results.into_iter().flatten().collect())
    }

    /// Launches `count` sessions concurrently. If any launch fails, the ones
    /// that succeeded are terminated and the first error is returned.
    async fn launch_all(&self, count: usize) -> Result<Vec<F::Session>, CrawlError> {
        let launches = join_all((0..count).map(|_| self.factory.create())).await;

        let mut sessions = Vec::with_capacity(count);
        let mut first_err = None;
        for launch in launches {
            match launch {
                Ok(session) => sessions.push(session),
                Err(e) => {
                    first_err.get_or_insert(e);
                }
            }
        }

        match first_err {
            None => Ok(sessions),
            Some(err) => {
                for session in &mut sessions {
                    session.terminate().await;
                }
                Err(err)
            }
        }
    }

    async fn run_partition(&self, session: &mut F::Session, urls: &[String]) -> Vec<BatchEntry> {
        let mut entries = Vec::with_capacity(urls.len());
        for url in urls {
            let result = self.crawl_in(session, url).await;
            entries.push(BatchEntry::from_result(url, result));
        }
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_serializes_with_literal_error_and_detail() {
        let err = CrawlError::navigation("https://www.amazon.com/dp/X", "timed out after 60s");
        let entry = BatchEntry::failed("https://www.amazon.com/dp/X", &err);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["error"], "Crawl Failed");
        assert_eq!(
            json["detail"],
            "navigation to https://www.amazon.com/dp/X failed: timed out after 60s"
        );
        assert_eq!(json["url"], "https://www.amazon.com/dp/X");
        assert_eq!(json["code"], "navigation_error");
    }

    #[test]
    fn success_serializes_as_bare_record() {
        let entry = BatchEntry::Product(ProductRecord::new("https://www.amazon.com/dp/Y"));
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["url"], "https://www.amazon.com/dp/Y");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn untagged_entries_deserialize_by_shape() {
        let entries: Vec<BatchEntry> = serde_json::from_str(
            r#"[
                {"url": "https://a.example/1", "title": "Robot"},
                {"error": "Crawl Failed", "detail": "boom", "url": "https://a.example/2", "code": "parse_error"}
            ]"#,
        )
        .unwrap();
        assert!(!entries[0].is_failure());
        assert!(entries[1].is_failure());
    }
}
