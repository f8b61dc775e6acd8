use thiserror::Error;

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("failed to start browser session: {0}")]
    SessionStart(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("markup could not be parsed: {0}")]
    Parse(String),

    #[error("invalid CSS selector \"{selector}\": {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("invalid image resize pattern \"{pattern}\": {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("no ruleset registered for target \"{0}\"")]
    UnknownTarget(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited by {domain} (retry after {retry_after_secs}s)")]
    RateLimited {
        domain: String,
        retry_after_secs: u64,
    },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("failed to persist record to {path}: {source}")]
    Persist {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl CrawlError {
    /// Stable machine-readable code for API payloads and batch error entries.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            CrawlError::SessionStart(_) => "session_start_error",
            CrawlError::Navigation { .. } => "navigation_error",
            CrawlError::Parse(_) => "parse_error",
            CrawlError::InvalidSelector { .. }
            | CrawlError::InvalidPattern { .. }
            | CrawlError::UnknownTarget(_) => "configuration_error",
            CrawlError::Http(_) => "http_error",
            CrawlError::RateLimited { .. } => "rate_limited",
            CrawlError::UnexpectedStatus { .. } => "upstream_status",
            CrawlError::Persist { .. } | CrawlError::Serialize(_) => "persistence_error",
        }
    }

    pub(crate) fn navigation(url: &str, reason: impl std::fmt::Display) -> Self {
        CrawlError::Navigation {
            url: url.to_owned(),
            reason: reason.to_string(),
        }
    }
}
