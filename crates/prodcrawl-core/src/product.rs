use serde::{Deserialize, Serialize};

/// The canonical product record every extraction backend converges to.
///
/// Every field except `url` is best-effort: a field the page does not expose
/// stays `None` without affecting the others.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Site-native product identifier (e.g. an Amazon ASIN).
    pub id: Option<String>,
    pub sku: Option<String>,
    pub upc: Option<String>,
    pub mfr_number: Option<String>,
    pub brand: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    /// First breadcrumb entry.
    pub category: Option<String>,
    /// Second breadcrumb entry.
    pub sub_category: Option<String>,
    pub recommended_age: Option<String>,
    pub language: Option<String>,
    /// Price exactly as the page exposes it, e.g. `"24.99"`.
    pub price: Option<String>,
    /// Currency symbol or code, e.g. `"$"` or `"EUR"`.
    pub currency: Option<String>,
    pub availability: Option<String>,
    /// Product image URLs, de-duplicated. The main image, when found, is
    /// always at index 0.
    #[serde(default)]
    pub images: Vec<String>,
    /// The page the record was extracted from.
    pub url: String,
}

impl ProductRecord {
    /// An empty record for `url`, with every optional field absent.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}
