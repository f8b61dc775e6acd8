//! Declarative extraction rulesets, keyed by target site.
//!
//! A [`Ruleset`] says *where* each product field lives on a page template;
//! it carries no behavior. The scraper crate compiles a ruleset once at
//! startup and shares it read-only across every extraction.
//!
//! Two targets ship built in (`amazon`, `toysrus`). A YAML file shaped like
//! `config/rulesets.yaml` can add targets or replace built-ins by key, so new
//! sites are added by data rather than code.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Scalar product fields that can be populated by an [`ExtractionRule`].
///
/// `category`/`sub_category` come from [`Ruleset::breadcrumbs`], `images` from
/// [`Ruleset::images`], and `url` from the request itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Id,
    Sku,
    Upc,
    MfrNumber,
    Brand,
    Title,
    Description,
    RecommendedAge,
    Language,
    Price,
    Currency,
    Availability,
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Field::Id => "id",
            Field::Sku => "sku",
            Field::Upc => "upc",
            Field::MfrNumber => "mfr_number",
            Field::Brand => "brand",
            Field::Title => "title",
            Field::Description => "description",
            Field::RecommendedAge => "recommended_age",
            Field::Language => "language",
            Field::Price => "price",
            Field::Currency => "currency",
            Field::Availability => "availability",
        };
        f.write_str(name)
    }
}

/// One place a field value may come from, tagged by extraction strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum Source {
    /// Whitespace-trimmed text content of the first matching element.
    Text { selector: String },
    /// A named attribute of the first matching element.
    Attribute { selector: String, attribute: String },
    /// The value of the first [`DetailsTable`] row whose label contains any of
    /// `keywords` (case-insensitive).
    Keywords { keywords: Vec<String> },
}

impl Source {
    #[must_use]
    pub fn text(selector: &str) -> Self {
        Self::Text {
            selector: selector.to_string(),
        }
    }

    #[must_use]
    pub fn attribute(selector: &str, attribute: &str) -> Self {
        Self::Attribute {
            selector: selector.to_string(),
            attribute: attribute.to_string(),
        }
    }

    #[must_use]
    pub fn keywords(keywords: &[&str]) -> Self {
        Self::Keywords {
            keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
        }
    }
}

/// Where to find one field. `sources` are tried in order; the first that
/// yields a non-empty value wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRule {
    pub field: Field,
    pub sources: Vec<Source>,
}

impl ExtractionRule {
    #[must_use]
    pub fn new(field: Field, sources: Vec<Source>) -> Self {
        Self { field, sources }
    }
}

/// Label/value rows scanned by [`Source::Keywords`].
///
/// When `label` and `value` are both set they select the label and value
/// cells inside each row. When either is absent, the row text is split at its
/// first `:` instead (`"UPC: 0123"` → `"UPC"`, `"0123"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailsTable {
    pub rows: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

/// An element/attribute pair that yields an image URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSource {
    pub selector: String,
    #[serde(default = "default_image_attribute")]
    pub attribute: String,
}

impl ImageSource {
    #[must_use]
    pub fn new(selector: &str, attribute: &str) -> Self {
        Self {
            selector: selector.to_string(),
            attribute: attribute.to_string(),
        }
    }
}

fn default_image_attribute() -> String {
    "src".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRules {
    /// The distinguished primary image; forced to index 0 when found.
    #[serde(default)]
    pub main: Option<ImageSource>,
    #[serde(default)]
    pub gallery: Vec<ImageSource>,
    /// Only URLs containing this substring are product images.
    #[serde(default)]
    pub product_path_marker: Option<String>,
    /// Regex for the site's resize/transform token; every match is replaced
    /// with `"."`.
    #[serde(default)]
    pub resize_pattern: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ruleset {
    #[serde(default)]
    pub rules: Vec<ExtractionRule>,
    #[serde(default)]
    pub details: Option<DetailsTable>,
    /// Ordered breadcrumb elements: first → category, second → sub-category.
    #[serde(default)]
    pub breadcrumbs: Option<String>,
    /// Path token preceding the product id in page URLs (e.g. `"/dp/"`), used
    /// when no `id` rule matches.
    #[serde(default)]
    pub url_id_marker: Option<String>,
    #[serde(default)]
    pub images: ImageRules,
}

/// Immutable map of target key → [`Ruleset`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RulesetRegistry {
    rulesets: BTreeMap<String, Ruleset>,
}

impl RulesetRegistry {
    #[must_use]
    pub fn get(&self, target: &str) -> Option<&Ruleset> {
        self.rulesets.get(target)
    }

    /// Registered target keys in sorted order.
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.rulesets.keys().map(String::as_str)
    }
}

#[derive(Debug, Deserialize)]
struct RulesetsFile {
    rulesets: BTreeMap<String, Ruleset>,
}

/// The built-in rulesets: `amazon` (browser path) and `toysrus` (plain HTTP
/// path).
#[must_use]
pub fn builtin_registry() -> RulesetRegistry {
    let mut rulesets = BTreeMap::new();
    rulesets.insert("amazon".to_string(), amazon());
    rulesets.insert("toysrus".to_string(), toysrus());
    RulesetRegistry { rulesets }
}

/// Load rulesets from a YAML file and layer them over [`builtin_registry`].
///
/// A target present in the file replaces the built-in ruleset with the same
/// key wholesale; it is not merged field by field.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_rulesets(path: &Path) -> Result<RulesetRegistry, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::RulesetsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_rulesets(&content)
}

fn parse_rulesets(content: &str) -> Result<RulesetRegistry, ConfigError> {
    let file: RulesetsFile =
        serde_yaml::from_str(content).map_err(ConfigError::RulesetsFileParse)?;

    for (target, ruleset) in &file.rulesets {
        validate_ruleset(target, ruleset)?;
    }

    let mut registry = builtin_registry();
    registry.rulesets.extend(file.rulesets);
    Ok(registry)
}

fn validate_ruleset(target: &str, ruleset: &Ruleset) -> Result<(), ConfigError> {
    if target.trim().is_empty() {
        return Err(ConfigError::Validation(
            "ruleset target key must be non-empty".to_string(),
        ));
    }

    let has_images = ruleset.images.main.is_some() || !ruleset.images.gallery.is_empty();
    if ruleset.rules.is_empty() && !has_images {
        return Err(ConfigError::Validation(format!(
            "ruleset '{target}' defines no rules and no image sources"
        )));
    }

    let mut seen_fields = HashSet::new();
    for rule in &ruleset.rules {
        if !seen_fields.insert(rule.field) {
            return Err(ConfigError::Validation(format!(
                "ruleset '{target}' has more than one rule for field '{}'",
                rule.field
            )));
        }
        if rule.sources.is_empty() {
            return Err(ConfigError::Validation(format!(
                "ruleset '{target}' field '{}' has no sources",
                rule.field
            )));
        }
        for source in &rule.sources {
            validate_source(target, rule.field, source, ruleset.details.is_some())?;
        }
    }

    let image_sources = ruleset
        .images
        .main
        .iter()
        .chain(ruleset.images.gallery.iter());
    for image in image_sources {
        if image.selector.trim().is_empty() || image.attribute.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "ruleset '{target}' has an image source with an empty selector or attribute"
            )));
        }
    }

    Ok(())
}

fn validate_source(
    target: &str,
    field: Field,
    source: &Source,
    has_details: bool,
) -> Result<(), ConfigError> {
    match source {
        Source::Text { selector } if selector.trim().is_empty() => Err(ConfigError::Validation(
            format!("ruleset '{target}' field '{field}' has an empty text selector"),
        )),
        Source::Attribute {
            selector,
            attribute,
        } if selector.trim().is_empty() || attribute.trim().is_empty() => {
            Err(ConfigError::Validation(format!(
                "ruleset '{target}' field '{field}' has an empty attribute selector or name"
            )))
        }
        Source::Keywords { keywords } if keywords.iter().all(|k| k.trim().is_empty()) => {
            Err(ConfigError::Validation(format!(
                "ruleset '{target}' field '{field}' has an empty keyword list"
            )))
        }
        Source::Keywords { .. } if !has_details => Err(ConfigError::Validation(format!(
            "ruleset '{target}' field '{field}' uses keywords but defines no details table"
        ))),
        _ => Ok(()),
    }
}

fn amazon() -> Ruleset {
    Ruleset {
        rules: vec![
            ExtractionRule::new(Field::Id, vec![Source::attribute("input#asin", "value")]),
            ExtractionRule::new(
                Field::Price,
                vec![
                    Source::attribute("input#priceValue", "value"),
                    Source::text("#corePrice_feature_div .a-offscreen"),
                ],
            ),
            ExtractionRule::new(
                Field::Currency,
                vec![Source::attribute("input#priceSymbol", "value")],
            ),
            ExtractionRule::new(Field::Title, vec![Source::text("#productTitle")]),
            ExtractionRule::new(Field::Description, vec![Source::text("#feature-bullets")]),
            ExtractionRule::new(Field::Availability, vec![Source::text("#availability")]),
            ExtractionRule::new(
                Field::Brand,
                vec![Source::keywords(&[
                    "Fabricante",
                    "Manufacturer",
                    "Brand",
                    "Marca",
                ])],
            ),
            ExtractionRule::new(
                Field::RecommendedAge,
                vec![Source::keywords(&[
                    "Edad recomendada por el fabricante",
                    "Manufacturer recommended age",
                    "Recommended Age",
                ])],
            ),
        ],
        details: Some(DetailsTable {
            rows: "#productDetails_detailBullets_sections1 tr".to_string(),
            label: Some("th".to_string()),
            value: Some("td".to_string()),
        }),
        breadcrumbs: Some(
            "#wayfinding-breadcrumbs_feature_div ul li:not(.a-breadcrumb-divider) a".to_string(),
        ),
        url_id_marker: Some("/dp/".to_string()),
        images: ImageRules {
            main: Some(ImageSource::new("#landingImage", "src")),
            gallery: vec![ImageSource::new("#altImages ul li img", "src")],
            product_path_marker: Some("/images/I/".to_string()),
            resize_pattern: Some(r"\._[A-Z0-9_]+_\.".to_string()),
        },
    }
}

fn toysrus() -> Ruleset {
    const SKU: &str = r#".b-product_details-sku strong[data-attribute="SKN"]"#;

    Ruleset {
        rules: vec![
            ExtractionRule::new(Field::Id, vec![Source::text(SKU)]),
            ExtractionRule::new(Field::Sku, vec![Source::text(SKU)]),
            ExtractionRule::new(
                Field::Title,
                vec![Source::text(
                    r#"h1.b-product_details-name[data-attribute="productName"]"#,
                )],
            ),
            ExtractionRule::new(
                Field::Brand,
                vec![
                    Source::text(r#"span[data-attribute="brand"]"#),
                    Source::keywords(&["Brand"]),
                ],
            ),
            ExtractionRule::new(
                Field::Description,
                vec![Source::text(".b-product_description")],
            ),
            ExtractionRule::new(
                Field::Price,
                vec![Source::text(".b-price-value.js-sales-price-value")],
            ),
            ExtractionRule::new(
                Field::Currency,
                vec![Source::attribute(r#"meta[itemprop="priceCurrency"]"#, "content")],
            ),
            ExtractionRule::new(Field::Upc, vec![Source::keywords(&["UPC"])]),
            ExtractionRule::new(
                Field::MfrNumber,
                vec![Source::keywords(&[
                    "Manufacturer Number",
                    "Mfr",
                    "Model Number",
                ])],
            ),
            ExtractionRule::new(
                Field::RecommendedAge,
                vec![Source::keywords(&["Recommended Age", "Age Range"])],
            ),
            ExtractionRule::new(Field::Language, vec![Source::keywords(&["Language"])]),
        ],
        details: Some(DetailsTable {
            rows: ".additional-info-list li".to_string(),
            label: None,
            value: None,
        }),
        breadcrumbs: Some(r#".b-breadcrumbs-item span[itemprop="name"]"#.to_string()),
        url_id_marker: None,
        images: ImageRules {
            main: Some(ImageSource::new(r#"meta[property="og:image"]"#, "content")),
            gallery: vec![ImageSource::new(
                ".b-product_gallery img, .b-product_carousel img",
                "src",
            )],
            product_path_marker: None,
            resize_pattern: None,
        },
    }
}

#[cfg(test)]
#[path = "ruleset_test.rs"]
mod tests;
