//! [`BrowserSession`] backed by a headless Chromium driven over CDP.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use prodcrawl_core::BrowserSettings;
use tokio::task::JoinHandle;

use super::{BrowserSession, SessionFactory, SessionState};
use crate::error::CrawlError;

/// Clicks the "Continue shopping" interstitial button when its text is
/// visible. `innerText` only contains rendered text, so hidden copies of the
/// phrase do not count.
const DISMISS_INTERSTITIAL_JS: &str = r#"(() => {
    const body = document.body;
    if (!body || !body.innerText.includes('Continue shopping')) return false;
    const button = document.querySelector('button[alt="Continue shopping"]');
    if (!button || button.getClientRects().length === 0) return false;
    button.click();
    return true;
})()"#;

const BLANK_PAGE: &str = "about:blank";

/// Launches one Chromium process per session.
#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    settings: Arc<BrowserSettings>,
}

impl ChromiumLauncher {
    #[must_use]
    pub fn new(settings: BrowserSettings) -> Self {
        Self {
            settings: Arc::new(settings),
        }
    }

    fn browser_config(&self) -> Result<BrowserConfig, CrawlError> {
        let settings = &self.settings;
        let mut builder = BrowserConfig::builder()
            .request_timeout(Duration::from_secs(settings.timeout_secs))
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg(format!("--user-agent={}", settings.user_agent));
        if settings.stealth {
            builder = builder.arg("--disable-blink-features=AutomationControlled");
        }
        if !settings.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &settings.executable {
            builder = builder.chrome_executable(path);
        }
        builder
            .build()
            .map_err(|e| CrawlError::SessionStart(format!("invalid browser config: {e}")))
    }
}

#[async_trait]
impl SessionFactory for ChromiumLauncher {
    type Session = ChromiumSession;

    async fn create(&self) -> Result<ChromiumSession, CrawlError> {
        let config = self.browser_config()?;
        let timeout = Duration::from_secs(self.settings.timeout_secs);

        let (mut browser, mut handler) = tokio::time::timeout(timeout, Browser::launch(config))
            .await
            .map_err(|_| {
                CrawlError::SessionStart(format!(
                    "browser launch timed out after {}s",
                    self.settings.timeout_secs
                ))
            })?
            .map_err(|e| CrawlError::SessionStart(format!("browser launch failed: {e}")))?;

        let handler = tokio::spawn(async move { while handler.next().await.is_some() {} });

        let page = match browser.new_page(BLANK_PAGE).await {
            Ok(page) => page,
            Err(e) => {
                if let Err(close_err) = browser.close().await {
                    tracing::warn!(error = %close_err, "browser close after failed page open");
                }
                handler.abort();
                return Err(CrawlError::SessionStart(format!("failed to open page: {e}")));
            }
        };

        if self.settings.stealth {
            if let Err(e) = page.enable_stealth_mode().await {
                tracing::warn!(error = %e, "stealth patches not applied");
            }
        }

        tracing::info!(
            headless = self.settings.headless,
            stealth = self.settings.stealth,
            "browser session launched"
        );

        Ok(ChromiumSession {
            browser,
            page,
            handler,
            settings: Arc::clone(&self.settings),
            state: SessionState::Created,
            current_url: None,
        })
    }
}

/// A Chromium process plus the single page all navigations go through.
pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    settings: Arc<BrowserSettings>,
    state: SessionState,
    current_url: Option<String>,
}

impl std::fmt::Debug for ChromiumSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromiumSession")
            .field("state", &self.state)
            .field("current_url", &self.current_url)
            .finish_non_exhaustive()
    }
}

impl ChromiumSession {
    fn timeout(&self) -> Duration {
        Duration::from_secs(self.settings.timeout_secs)
    }

    fn current_url(&self) -> &str {
        self.current_url.as_deref().unwrap_or(BLANK_PAGE)
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, url: &str) -> Result<(), CrawlError> {
        if self.state == SessionState::Terminated {
            return Err(CrawlError::navigation(url, "session already terminated"));
        }
        self.state = SessionState::Navigating;
        tracing::debug!(url, "navigating");

        let outcome = tokio::time::timeout(self.timeout(), self.page.goto(url)).await;
        self.state = SessionState::Ready;
        match outcome {
            Err(_) => {
                return Err(CrawlError::navigation(
                    url,
                    format!("timed out after {}s", self.settings.timeout_secs),
                ))
            }
            Ok(Err(e)) => return Err(CrawlError::navigation(url, e)),
            Ok(Ok(_)) => {}
        }

        self.current_url = Some(url.to_owned());
        tokio::time::sleep(Duration::from_millis(self.settings.settle_ms)).await;
        Ok(())
    }

    async fn dismiss_interstitial(&mut self) -> bool {
        let probe =
            tokio::time::timeout(self.timeout(), self.page.evaluate(DISMISS_INTERSTITIAL_JS))
                .await;
        let clicked = match probe {
            Ok(Ok(result)) => result.into_value::<bool>().unwrap_or(false),
            Ok(Err(e)) => {
                tracing::debug!(url = self.current_url(), error = %e, "interstitial probe failed");
                false
            }
            Err(_) => false,
        };
        if clicked {
            tracing::info!(url = self.current_url(), "dismissed interstitial");
            tokio::time::sleep(Duration::from_millis(self.settings.interstitial_settle_ms)).await;
        }
        clicked
    }

    async fn read_markup(&mut self) -> Result<String, CrawlError> {
        if self.state == SessionState::Terminated {
            return Err(CrawlError::navigation(
                self.current_url(),
                "session already terminated",
            ));
        }
        match tokio::time::timeout(self.timeout(), self.page.content()).await {
            Ok(Ok(markup)) => Ok(markup),
            Ok(Err(e)) => Err(CrawlError::navigation(
                self.current_url(),
                format!("failed to read page content: {e}"),
            )),
            Err(_) => Err(CrawlError::navigation(
                self.current_url(),
                "timed out reading page content",
            )),
        }
    }

    async fn terminate(&mut self) {
        if self.state == SessionState::Terminated {
            return;
        }
        self.state = SessionState::Terminated;

        if let Err(e) = self.browser.close().await {
            tracing::warn!(error = %e, "browser close error");
        }
        if let Err(e) = self.browser.wait().await {
            tracing::debug!(error = %e, "browser process wait error");
        }
        self.handler.abort();
        tracing::info!("browser session terminated");
    }

    fn state(&self) -> SessionState {
        self.state
    }
}
