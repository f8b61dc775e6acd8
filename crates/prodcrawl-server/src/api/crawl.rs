use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use prodcrawl_core::ProductRecord;
use prodcrawl_scraper::{BatchEntry, ProductCrawler};
use reqwest::Url;
use serde::Deserialize;

use super::{map_crawl_error, ApiError, AppState};
use crate::middleware::RequestId;

#[derive(Debug, Deserialize)]
pub(super) struct CrawlRequest {
    url: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct BatchCrawlRequest {
    urls: Vec<String>,
}

pub(super) async fn crawl_http(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    payload: Result<Json<CrawlRequest>, JsonRejection>,
) -> Result<Json<ProductRecord>, ApiError> {
    crawl_one(state.http.as_ref(), req_id, payload).await
}

pub(super) async fn crawl_browser(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    payload: Result<Json<CrawlRequest>, JsonRejection>,
) -> Result<Json<ProductRecord>, ApiError> {
    crawl_one(state.browser.as_ref(), req_id, payload).await
}

pub(super) async fn batch_crawl_http(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    payload: Result<Json<BatchCrawlRequest>, JsonRejection>,
) -> Result<Json<Vec<BatchEntry>>, ApiError> {
    crawl_many(state.http.as_ref(), req_id, payload).await
}

pub(super) async fn batch_crawl_browser(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    payload: Result<Json<BatchCrawlRequest>, JsonRejection>,
) -> Result<Json<Vec<BatchEntry>>, ApiError> {
    crawl_many(state.browser.as_ref(), req_id, payload).await
}

async fn crawl_one(
    crawler: &dyn ProductCrawler,
    RequestId(req_id): RequestId,
    payload: Result<Json<CrawlRequest>, JsonRejection>,
) -> Result<Json<ProductRecord>, ApiError> {
    let Json(body) = payload.map_err(|e| ApiError::validation(req_id.clone(), e.body_text()))?;
    let url = validate_url(&body.url).map_err(|msg| ApiError::validation(req_id.clone(), msg))?;

    crawler
        .crawl(&url)
        .await
        .map(Json)
        .map_err(|e| map_crawl_error(req_id, &e))
}

async fn crawl_many(
    crawler: &dyn ProductCrawler,
    RequestId(req_id): RequestId,
    payload: Result<Json<BatchCrawlRequest>, JsonRejection>,
) -> Result<Json<Vec<BatchEntry>>, ApiError> {
    let Json(body) = payload.map_err(|e| ApiError::validation(req_id.clone(), e.body_text()))?;
    let urls = validate_urls(&body.urls).map_err(|msg| ApiError::validation(req_id.clone(), msg))?;

    crawler
        .crawl_batch(&urls)
        .await
        .map(Json)
        .map_err(|e| map_crawl_error(req_id, &e))
}

/// Accepts only absolute `http`/`https` URLs with a host. Returns the
/// trimmed URL.
pub(super) fn validate_url(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("url must not be empty".to_owned());
    }
    let parsed = Url::parse(trimmed).map_err(|e| format!("invalid url \"{trimmed}\": {e}"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(format!("url \"{trimmed}\" must use http or https"));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(format!("url \"{trimmed}\" must include a host"));
    }
    Ok(trimmed.to_owned())
}

pub(super) fn validate_urls(raw: &[String]) -> Result<Vec<String>, String> {
    if raw.is_empty() {
        return Err("urls must not be empty".to_owned());
    }
    raw.iter()
        .enumerate()
        .map(|(i, url)| validate_url(url).map_err(|msg| format!("urls[{i}]: {msg}")))
        .collect()
}
