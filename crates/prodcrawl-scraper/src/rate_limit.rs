//! Retry with exponential backoff for the plain HTTP fetch path.
//!
//! Only transient failures are retried: 429 responses, network-level errors,
//! and 5xx statuses. Everything else (4xx, empty documents, persistence
//! failures) propagates on the first attempt.

use std::future::Future;
use std::time::Duration;

use crate::error::CrawlError;

/// Returns `true` if `err` is worth another attempt after a backoff delay.
fn is_retriable(err: &CrawlError) -> bool {
    match err {
        CrawlError::RateLimited { .. } | CrawlError::Http(_) => true,
        CrawlError::UnexpectedStatus { status, .. } => *status >= 500,
        _ => false,
    }
}

/// Executes `operation`, retrying transient errors up to `max_retries`
/// additional times. The wait before retry `n` (1-based) is
/// `backoff_base_secs * 2^(n-1)` seconds.
///
/// | Attempt | Sleep before it (`backoff_base_secs = 1`) |
/// |---------|-------------------------------------------|
/// | 0 (initial) | none |
/// | 1 | 1 s |
/// | 2 | 2 s |
/// | 3 | 4 s |
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, CrawlError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CrawlError>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !is_retriable(&err) || attempt >= max_retries {
            return Err(err);
        }

        let delay_secs = backoff_base_secs.saturating_mul(1u64 << attempt.min(62));
        tracing::warn!(
            attempt,
            max_retries,
            delay_secs,
            error = %err,
            "transient fetch error, retrying after backoff"
        );
        tokio::time::sleep(Duration::from_secs(delay_secs)).await;
        attempt += 1;
    }
}
