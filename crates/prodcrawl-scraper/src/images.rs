//! Image URL filtering, normalization, and ordered de-duplication.

use prodcrawl_core::ImageRules;
use regex::Regex;
use reqwest::Url;

use crate::error::CrawlError;

/// Compiled form of the image-related parts of a ruleset.
#[derive(Debug)]
pub(crate) struct ImageNormalizer {
    product_path_marker: Option<String>,
    resize: Option<Regex>,
}

impl ImageNormalizer {
    pub(crate) fn new(rules: &ImageRules) -> Result<Self, CrawlError> {
        let resize = rules
            .resize_pattern
            .as_deref()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| CrawlError::InvalidPattern {
                    pattern: pattern.to_owned(),
                    source,
                })
            })
            .transpose()?;
        Ok(Self {
            product_path_marker: rules.product_path_marker.clone(),
            resize,
        })
    }

    /// Icons, badges, sprites, and inline placeholders fail this check.
    pub(crate) fn is_product_image(&self, url: &str) -> bool {
        if url.starts_with("data:") {
            return false;
        }
        self.product_path_marker
            .as_deref()
            .is_none_or(|marker| url.contains(marker))
    }

    /// Strips the resize/transform token, e.g.
    /// `.../I/71abc._AC_SX679_.jpg` → `.../I/71abc.jpg`.
    pub(crate) fn strip_resize_token(&self, url: &str) -> String {
        match &self.resize {
            Some(re) => re.replace_all(url, ".").into_owned(),
            None => url.to_owned(),
        }
    }

    /// Resolves `raw` against the page URL, filters non-product images, and
    /// normalizes what survives. `None` means the candidate is discarded.
    pub(crate) fn prepare(&self, raw: &str, page: Option<&Url>) -> Option<String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        let absolute = match page {
            Some(base) if !raw.starts_with("data:") => base
                .join(raw)
                .map_or_else(|_| raw.to_owned(), |u| u.to_string()),
            _ => raw.to_owned(),
        };
        if !self.is_product_image(&absolute) {
            return None;
        }
        Some(self.strip_resize_token(&absolute))
    }
}

/// Appends `url` unless an equal entry is already present.
pub(crate) fn push_unique(images: &mut Vec<String>, url: String) {
    if !images.contains(&url) {
        images.push(url);
    }
}

/// Places `url` at index 0, removing any later duplicate so it appears once.
pub(crate) fn promote_main(images: &mut Vec<String>, url: String) {
    images.retain(|existing| *existing != url);
    images.insert(0, url);
}
