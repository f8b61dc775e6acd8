//! Page Extractor: rendered markup + compiled ruleset → [`ProductRecord`].
//!
//! Extraction is best-effort. A selector that matches nothing leaves its
//! field absent and never fails the page; the only error is markup that is
//! empty and therefore cannot be a document at all.

use prodcrawl_core::{DetailsTable, Field, ImageSource, ProductRecord, Ruleset, Source};
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

use crate::error::CrawlError;
use crate::images::{promote_main, push_unique, ImageNormalizer};

/// A [`Ruleset`] with every selector and pattern compiled.
///
/// Built once per target at startup and shared read-only (behind `Arc`)
/// across all extractions. `extract` is a pure function of its inputs.
#[derive(Debug)]
pub struct PageExtractor {
    rules: Vec<CompiledRule>,
    details: Option<CompiledDetails>,
    breadcrumbs: Option<Selector>,
    url_id_marker: Option<String>,
    main_image: Option<CompiledImage>,
    gallery: Vec<CompiledImage>,
    images: ImageNormalizer,
    /// Every lowercased keyword of every keyword source, used to decide which
    /// field a details row belongs to.
    keywords: Vec<String>,
}

#[derive(Debug)]
struct CompiledRule {
    field: Field,
    sources: Vec<CompiledSource>,
}

#[derive(Debug)]
enum CompiledSource {
    Text(Selector),
    Attribute(Selector, String),
    /// Keywords are stored lowercased.
    Keywords(Vec<String>),
}

#[derive(Debug)]
struct CompiledDetails {
    rows: Selector,
    /// `(label, value)` cell selectors; `None` means split row text at `:`.
    cells: Option<(Selector, Selector)>,
}

/// One details-table row with its label lowercased.
///
/// `claim` is the length of the longest ruleset keyword contained in the
/// label. A keyword source only takes the row when its own best match is that
/// long, so `Manufacturer recommended age` goes to the age field and never to
/// a field keyed on `Manufacturer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DetailRow {
    label: String,
    value: String,
    claim: usize,
}

impl DetailRow {
    pub(crate) fn new(label: &str, value: String, keywords: &[String]) -> Self {
        let label = label.to_lowercase();
        let claim = longest_match(&label, keywords);
        Self {
            label,
            value,
            claim,
        }
    }
}

#[derive(Debug)]
struct CompiledImage {
    selector: Selector,
    attribute: String,
}

fn compile(selector: &str) -> Result<Selector, CrawlError> {
    Selector::parse(selector).map_err(|e| CrawlError::InvalidSelector {
        selector: selector.to_owned(),
        reason: e.to_string(),
    })
}

impl PageExtractor {
    /// Compiles `ruleset`.
    ///
    /// # Errors
    ///
    /// - [`CrawlError::InvalidSelector`] if any CSS selector does not parse.
    /// - [`CrawlError::InvalidPattern`] if the image resize pattern is not a valid regex.
    pub fn new(ruleset: &Ruleset) -> Result<Self, CrawlError> {
        let rules = ruleset
            .rules
            .iter()
            .map(|rule| {
                let sources = rule
                    .sources
                    .iter()
                    .map(compile_source)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(CompiledRule {
                    field: rule.field,
                    sources,
                })
            })
            .collect::<Result<Vec<_>, CrawlError>>()?;

        let keywords = rules
            .iter()
            .flat_map(|rule| &rule.sources)
            .filter_map(|source| match source {
                CompiledSource::Keywords(keywords) => Some(keywords),
                _ => None,
            })
            .flatten()
            .cloned()
            .collect();

        let details = ruleset.details.as_ref().map(compile_details).transpose()?;
        let breadcrumbs = ruleset.breadcrumbs.as_deref().map(compile).transpose()?;
        let main_image = ruleset.images.main.as_ref().map(compile_image).transpose()?;
        let gallery = ruleset
            .images
            .gallery
            .iter()
            .map(compile_image)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            rules,
            details,
            breadcrumbs,
            url_id_marker: ruleset.url_id_marker.clone(),
            main_image,
            gallery,
            images: ImageNormalizer::new(&ruleset.images)?,
            keywords,
        })
    }

    /// Extracts a [`ProductRecord`] for `url` from its rendered `markup`.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Parse`] if `markup` is empty or whitespace-only.
    /// Missing fields are never an error.
    pub fn extract(&self, markup: &str, url: &str) -> Result<ProductRecord, CrawlError> {
        if markup.trim().is_empty() {
            return Err(CrawlError::Parse(format!("empty document for {url}")));
        }

        let document = Html::parse_document(markup);
        let mut record = ProductRecord::new(url);

        let rows = self
            .details
            .as_ref()
            .map(|d| detail_rows(&document, d))
            .unwrap_or_default()
            .into_iter()
            .map(|(label, value)| DetailRow::new(&label, value, &self.keywords))
            .collect::<Vec<_>>();

        for rule in &self.rules {
            let value = rule
                .sources
                .iter()
                .find_map(|source| apply_source(&document, source, &rows));
            if let Some(value) = value {
                set_field(&mut record, rule.field, value);
            }
        }

        if record.id.is_none() {
            record.id = self
                .url_id_marker
                .as_deref()
                .and_then(|marker| id_from_url(url, marker));
        }

        if let Some(selector) = &self.breadcrumbs {
            let mut crumbs = document
                .select(selector)
                .map(|el| element_text(&el))
                .filter(|t| !t.is_empty());
            record.category = crumbs.next();
            record.sub_category = crumbs.next();
        }

        record.images = self.collect_images(&document, url);

        Ok(record)
    }

    fn collect_images(&self, document: &Html, url: &str) -> Vec<String> {
        let page = Url::parse(url).ok();
        let mut images = Vec::new();

        for source in &self.gallery {
            for el in document.select(&source.selector) {
                let prepared = el
                    .value()
                    .attr(&source.attribute)
                    .and_then(|raw| self.images.prepare(raw, page.as_ref()));
                if let Some(image) = prepared {
                    push_unique(&mut images, image);
                }
            }
        }

        let main = self.main_image.as_ref().and_then(|source| {
            document
                .select(&source.selector)
                .next()
                .and_then(|el| el.value().attr(&source.attribute))
                .and_then(|raw| self.images.prepare(raw, page.as_ref()))
        });
        if let Some(main) = main {
            promote_main(&mut images, main);
        }

        images
    }
}

fn compile_source(source: &Source) -> Result<CompiledSource, CrawlError> {
    Ok(match source {
        Source::Text { selector } => CompiledSource::Text(compile(selector)?),
        Source::Attribute {
            selector,
            attribute,
        } => CompiledSource::Attribute(compile(selector)?, attribute.clone()),
        Source::Keywords { keywords } => CompiledSource::Keywords(
            keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        ),
    })
}

fn compile_details(details: &DetailsTable) -> Result<CompiledDetails, CrawlError> {
    let cells = match (&details.label, &details.value) {
        (Some(label), Some(value)) => Some((compile(label)?, compile(value)?)),
        _ => None,
    };
    Ok(CompiledDetails {
        rows: compile(&details.rows)?,
        cells,
    })
}

fn compile_image(image: &ImageSource) -> Result<CompiledImage, CrawlError> {
    Ok(CompiledImage {
        selector: compile(&image.selector)?,
        attribute: image.attribute.clone(),
    })
}

/// Text content of `el`, text nodes joined by a single space with runs of
/// whitespace collapsed.
fn element_text(el: &ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn apply_source(
    document: &Html,
    source: &CompiledSource,
    rows: &[DetailRow],
) -> Option<String> {
    match source {
        CompiledSource::Text(selector) => document
            .select(selector)
            .next()
            .and_then(|el| non_empty(element_text(&el))),
        CompiledSource::Attribute(selector, attribute) => document
            .select(selector)
            .next()
            .and_then(|el| el.value().attr(attribute))
            .and_then(|v| non_empty(v.trim().to_owned())),
        CompiledSource::Keywords(keywords) => lookup_keywords(rows, keywords),
    }
}

/// Value of the first non-empty row this keyword list claims. `keywords`
/// must already be lowercased.
pub(crate) fn lookup_keywords(rows: &[DetailRow], keywords: &[String]) -> Option<String> {
    rows.iter().find_map(|row| {
        if row.value.is_empty() {
            return None;
        }
        let best = longest_match(&row.label, keywords);
        (best > 0 && best == row.claim).then(|| row.value.clone())
    })
}

/// Length of the longest keyword contained in `label`, or 0.
fn longest_match(label: &str, keywords: &[String]) -> usize {
    keywords
        .iter()
        .filter(|k| label.contains(k.as_str()))
        .map(String::len)
        .max()
        .unwrap_or(0)
}

fn detail_rows(document: &Html, details: &CompiledDetails) -> Vec<(String, String)> {
    document
        .select(&details.rows)
        .filter_map(|row| match &details.cells {
            Some((label_sel, value_sel)) => {
                let label = row.select(label_sel).next()?;
                let value = row.select(value_sel).next()?;
                Some((element_text(&label), element_text(&value)))
            }
            None => {
                let text = element_text(&row);
                let (label, value) = text.split_once(':')?;
                Some((label.trim().to_owned(), value.trim().to_owned()))
            }
        })
        .collect()
}

/// Id from the path segment following `marker`, without any trailing path,
/// query, or fragment. `/dp/B000ABC123/ref=xyz` → `B000ABC123`.
pub(crate) fn id_from_url(url: &str, marker: &str) -> Option<String> {
    let (_, rest) = url.split_once(marker)?;
    let id = rest.split(['/', '?', '#']).next()?;
    non_empty(id.to_owned())
}

fn set_field(record: &mut ProductRecord, field: Field, value: String) {
    let slot = match field {
        Field::Id => &mut record.id,
        Field::Sku => &mut record.sku,
        Field::Upc => &mut record.upc,
        Field::MfrNumber => &mut record.mfr_number,
        Field::Brand => &mut record.brand,
        Field::Title => &mut record.title,
        Field::Description => &mut record.description,
        Field::RecommendedAge => &mut record.recommended_age,
        Field::Language => &mut record.language,
        Field::Price => &mut record.price,
        Field::Currency => &mut record.currency,
        Field::Availability => &mut record.availability,
    };
    *slot = Some(value);
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
