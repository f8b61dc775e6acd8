use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use prodcrawl_core::ProductRecord;
use prodcrawl_scraper::{BatchEntry, CrawlError, ProductCrawler};
use tower::ServiceExt;

use super::crawl::{validate_url, validate_urls};
use super::*;

/// Returns a record titled with `label` for every URL, except URLs
/// containing "fail", which produce a navigation error.
struct StubCrawler {
    label: &'static str,
    seen: Mutex<Vec<String>>,
}

impl StubCrawler {
    fn new(label: &'static str) -> Arc<Self> {
        Arc::new(Self {
            label,
            seen: Mutex::new(Vec::new()),
        })
    }

    fn outcome(&self, url: &str) -> Result<ProductRecord, CrawlError> {
        self.seen.lock().unwrap().push(url.to_owned());
        if url.contains("fail") {
            return Err(CrawlError::Navigation {
                url: url.to_owned(),
                reason: "timed out after 60s".to_owned(),
            });
        }
        Ok(ProductRecord {
            title: Some(self.label.to_owned()),
            ..ProductRecord::new(url)
        })
    }
}

#[async_trait]
impl ProductCrawler for StubCrawler {
    async fn crawl(&self, url: &str) -> Result<ProductRecord, CrawlError> {
        self.outcome(url)
    }

    async fn crawl_batch(&self, urls: &[String]) -> Result<Vec<BatchEntry>, CrawlError> {
        Ok(urls
            .iter()
            .map(|u| BatchEntry::from_result(u, self.outcome(u)))
            .collect())
    }
}

struct Harness {
    app: Router,
    http: Arc<StubCrawler>,
    browser: Arc<StubCrawler>,
}

fn harness() -> Harness {
    let http = StubCrawler::new("http");
    let browser = StubCrawler::new("browser");
    let app = build_app(AppState {
        http: http.clone(),
        browser: browser.clone(),
    });
    Harness { app, http, browser }
}

async fn post_json(app: Router, uri: &str, body: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .header("x-request-id", "req-123")
                .body(Body::from(body.to_owned()))
                .expect("request"),
        )
        .await
        .expect("response");
    let status = response.status();
    assert_eq!(
        response.headers().get("x-request-id").map(|v| v.to_str().unwrap()),
        Some("req-123")
    );
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json = serde_json::from_slice(&body).expect("json parse");
    (status, json)
}

#[tokio::test]
async fn root_reports_running() {
    let response = harness()
        .app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["message"], "prodcrawl-server is running");
}

#[tokio::test]
async fn crawl_routes_to_http_crawler() {
    let h = harness();
    let (status, json) = post_json(h.app, "/crawl", r#"{"url":"https://shop.example/p/1"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["title"], "http");
    assert_eq!(json["url"], "https://shop.example/p/1");
    assert_eq!(h.http.seen.lock().unwrap().len(), 1);
    assert!(h.browser.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn amazon_crawl_routes_to_browser_crawler() {
    let h = harness();
    let (status, json) = post_json(
        h.app,
        "/crawl/amazon",
        r#"{"url":"https://www.amazon.com/dp/B000ABC123"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["title"], "browser");
    assert!(h.http.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn crawl_failure_is_server_error_with_code() {
    let (status, json) = post_json(
        harness().app,
        "/crawl/amazon",
        r#"{"url":"https://www.amazon.com/dp/fail"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"]["code"], "navigation_error");
    assert_eq!(json["meta"]["request_id"], "req-123");
}

#[tokio::test]
async fn invalid_scheme_is_rejected_before_crawling() {
    let h = harness();
    let (status, json) = post_json(h.app, "/crawl", r#"{"url":"ftp://shop.example/p/1"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
    assert!(h.http.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_body_is_validation_error() {
    let (status, json) = post_json(harness().app, "/crawl", r#"{"link":"x"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
}

#[tokio::test]
async fn batch_returns_mixed_entries_in_order() {
    let (status, json) = post_json(
        harness().app,
        "/batch_crawl/amazon",
        r#"{"urls":["https://a.example/1","https://a.example/fail","https://a.example/3"]}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let entries = json.as_array().expect("array");
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["url"], "https://a.example/1");
    assert_eq!(entries[1]["error"], "Crawl Failed");
    assert_eq!(entries[1]["url"], "https://a.example/fail");
    assert_eq!(entries[1]["code"], "navigation_error");
    assert_eq!(entries[2]["title"], "browser");
}

#[tokio::test]
async fn empty_batch_is_rejected() {
    let h = harness();
    let (status, json) = post_json(h.app, "/batch_crawl", r#"{"urls":[]}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["message"], "urls must not be empty");
    assert!(h.http.seen.lock().unwrap().is_empty());
}

#[test]
fn validate_url_accepts_http_and_https() {
    assert_eq!(
        validate_url("  https://www.amazon.com/dp/B000ABC123 ").as_deref(),
        Ok("https://www.amazon.com/dp/B000ABC123")
    );
    assert!(validate_url("http://shop.example/p").is_ok());
}

#[test]
fn validate_url_rejects_bad_input() {
    assert!(validate_url("").is_err());
    assert!(validate_url("not a url").is_err());
    assert!(validate_url("/relative/path").is_err());
    assert!(validate_url("mailto:someone@example.com").is_err());
    assert!(validate_url("file:///etc/passwd").is_err());
}

#[test]
fn validate_urls_names_offending_index() {
    let err = validate_urls(&["https://ok.example".to_owned(), "nope".to_owned()]).unwrap_err();
    assert!(err.starts_with("urls[1]:"), "got {err}");
}

#[test]
fn api_error_validation_maps_to_bad_request() {
    let response = ApiError::validation("req-1", "bad").into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[test]
fn api_error_crawl_codes_map_to_server_error() {
    for code in ["session_start_error", "navigation_error", "rate_limited", "not_found"] {
        let response = ApiError::new("req-1", code, "crawl failed").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR, "{code}");
    }
}
