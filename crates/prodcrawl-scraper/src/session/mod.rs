//! Browser sessions: one live browser instance with a single open page.
//!
//! The orchestrator and batch driver depend only on [`BrowserSession`] and
//! [`SessionFactory`]; [`chromium`] provides the real implementation.

pub mod chromium;

use async_trait::async_trait;

use crate::error::CrawlError;

pub use chromium::{ChromiumLauncher, ChromiumSession};

/// Lifecycle of a session:
/// `Created → Ready → (Navigating ⇄ Ready) → Terminated`. `Terminated` is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Launched; nothing loaded yet.
    Created,
    Ready,
    Navigating,
    Terminated,
}

/// A live browser page that can be driven through one URL at a time.
///
/// Not safe for concurrent navigations; callers hold it by `&mut`.
#[async_trait]
pub trait BrowserSession: Send {
    /// Loads `url` and waits for the page to settle.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Navigation`] on load failure, timeout, or if the
    /// session has already been terminated.
    async fn navigate(&mut self, url: &str) -> Result<(), CrawlError>;

    /// Clicks through a blocking interstitial if one is showing. Returns
    /// whether anything was dismissed. Never fails.
    async fn dismiss_interstitial(&mut self) -> bool;

    /// Fully rendered markup of the current page.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Navigation`] if the markup cannot be retrieved.
    async fn read_markup(&mut self) -> Result<String, CrawlError>;

    /// Closes the browser. Idempotent; never fails.
    async fn terminate(&mut self);

    fn state(&self) -> SessionState;
}

/// Creates new sessions.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    type Session: BrowserSession;

    /// # Errors
    ///
    /// Returns [`CrawlError::SessionStart`] if the browser cannot be launched.
    async fn create(&self) -> Result<Self::Session, CrawlError>;
}

/// Where a crawl gets its session from.
///
/// `Launch` means the crawl owns the session and must terminate it on every
/// exit path. `Borrowed` sessions belong to the caller and are never
/// terminated by the crawl.
pub enum SessionSource<'a, S> {
    Launch,
    Borrowed(&'a mut S),
}

impl<S> std::fmt::Debug for SessionSource<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionSource::Launch => f.write_str("Launch"),
            SessionSource::Borrowed(_) => f.write_str("Borrowed"),
        }
    }
}
