//! Persistence of extracted records.

use std::path::PathBuf;

use async_trait::async_trait;
use prodcrawl_core::ProductRecord;

use crate::error::CrawlError;

/// File name used when a record has no usable id.
pub const FALLBACK_FILE_NAME: &str = "output.json";

/// Destination for successfully extracted records.
#[async_trait]
pub trait ProductSink: Send + Sync {
    /// Persists `record`, returning where it was written.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Persist`] or [`CrawlError::Serialize`] if the
    /// record cannot be written.
    async fn persist(&self, record: &ProductRecord) -> Result<PathBuf, CrawlError>;
}

/// Writes each record as pretty-printed JSON to `<dir>/<id>.json`, or
/// `<dir>/output.json` when the record has no id.
///
/// Records without an id overwrite one another; that is the documented
/// fallback, not an error.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Target path for `record`.
    #[must_use]
    pub fn path_for(&self, record: &ProductRecord) -> PathBuf {
        let name = record
            .id
            .as_deref()
            .map(sanitize_file_stem)
            .filter(|stem| !stem.is_empty())
            .map_or_else(|| FALLBACK_FILE_NAME.to_owned(), |stem| format!("{stem}.json"));
        self.dir.join(name)
    }
}

#[async_trait]
impl ProductSink for JsonFileSink {
    async fn persist(&self, record: &ProductRecord) -> Result<PathBuf, CrawlError> {
        let path = self.path_for(record);
        let body = serde_json::to_string_pretty(record)?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| CrawlError::Persist {
                path: self.dir.display().to_string(),
                source,
            })?;
        tokio::fs::write(&path, body)
            .await
            .map_err(|source| CrawlError::Persist {
                path: path.display().to_string(),
                source,
            })?;

        tracing::debug!(path = %path.display(), url = %record.url, "record persisted");
        Ok(path)
    }
}

/// Keeps ASCII alphanumerics, `-` and `_`; everything else becomes `_`.
/// Leading dots cannot survive, so the result never escapes the directory.
fn sanitize_file_stem(id: &str) -> String {
    id.trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
