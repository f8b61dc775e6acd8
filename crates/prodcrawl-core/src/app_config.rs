use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Settings for the plain HTTP fetch path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Additional attempts after the first failure for transient errors.
    pub max_retries: u32,
    /// Base delay for exponential backoff: `base * 2^attempt` seconds.
    pub retry_backoff_base_secs: u64,
}

/// Settings for browser-automation sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserSettings {
    pub headless: bool,
    /// Apply fingerprint-masking patches to every page the session opens.
    pub stealth: bool,
    pub user_agent: String,
    /// Upper bound for launch, navigation, and markup retrieval.
    pub timeout_secs: u64,
    /// Wait after page load before reading markup; client-side rendering may
    /// lag the load event.
    pub settle_ms: u64,
    /// Wait after clicking through an interstitial.
    pub interstitial_settle_ms: u64,
    /// Explicit Chrome/Chromium binary; auto-detected when `None`.
    pub executable: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub output_dir: PathBuf,
    /// Optional YAML file whose rulesets are layered over the built-ins.
    pub rulesets_path: Option<PathBuf>,
    /// Ruleset key used by the plain HTTP path (`/crawl`, `/batch_crawl`).
    pub http_target: String,
    /// Ruleset key used by the browser path (`/crawl/amazon`, `/batch_crawl/amazon`).
    pub browser_target: String,
    pub http: HttpSettings,
    pub browser: BrowserSettings,
    /// Distinct browser sessions a single batch may run concurrently.
    pub batch_max_sessions: usize,
}
