//! Content fetcher: classification, HTTP retrieval and cache writes.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use crawl_ls::cache::CacheIndex;
use crawl_ls::config::ServerConfig;
use crawl_ls::error::FetchError;
use crawl_ls::fetcher::{
    default_external_rules, is_content_too_short, is_external_url, ContentFetcher, FetchResult,
    HttpPageSource, Page, PageSource,
};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{files_under, ARTICLE_HTML};

fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

fn http_fetcher(config: &ServerConfig) -> ContentFetcher {
    let source = HttpPageSource::new(config.fetch_timeout).unwrap();
    ContentFetcher::new(Arc::new(source), config)
}

// ---------------------------------------------------------------------------
// classification
// ---------------------------------------------------------------------------

#[test]
fn video_pages_are_external() {
    let rules = default_external_rules();
    for external in [
        "https://www.youtube.com/watch?v=abc123",
        "https://youtube.com/shorts/xyz",
        "https://m.youtube.com/live/stream",
        "https://youtu.be/abc123",
        "https://vimeo.com/123456789",
        "https://www.twitch.tv/somechannel",
    ] {
        assert!(is_external_url(&url(external), &rules), "{external} should be external");
    }
}

#[test]
fn other_pages_on_video_domains_are_fetchable() {
    let rules = default_external_rules();
    for fetchable in [
        "https://www.youtube.com/about",
        "https://vimeo.com/features",
        "https://notyoutube.com/watch?v=1",
        "https://example.com/youtube.com/watch",
    ] {
        assert!(!is_external_url(&url(fetchable), &rules), "{fetchable} should be fetchable");
    }
}

#[test]
fn short_content_threshold() {
    assert!(is_content_too_short("Too short", 100));
    assert!(is_content_too_short(&format!("   {}   ", "a".repeat(99)), 100));
    assert!(!is_content_too_short(&"a".repeat(300), 100));
    assert!(!is_content_too_short(&"é".repeat(100), 100), "counts characters, not bytes");
}

// ---------------------------------------------------------------------------
// HTTP retrieval
// ---------------------------------------------------------------------------

#[tokio::test]
async fn html_page_is_converted_and_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/book/ownership"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(ARTICLE_HTML, "text/html; charset=utf-8"))
        .expect(1)
        .mount(&server)
        .await;

    let cache_dir = tempfile::tempdir().unwrap();
    let config = ServerConfig::new(cache_dir.path());
    let cache = CacheIndex::new(cache_dir.path());
    let page_url = url(&format!("{}/book/ownership", server.uri()));

    let result = http_fetcher(&config).fetch_url(&page_url, &cache).await.unwrap();

    let FetchResult::Cached(written) = result else {
        panic!("expected a cached page, got {result:?}");
    };
    assert_eq!(written, cache.path_for(&page_url).unwrap());
    let content = std::fs::read_to_string(&written).unwrap();
    assert!(content.starts_with("# Ownership\n\n"));
    assert!(content.contains("garbage collection"));
    assert!(!written.with_extension("md.partial").exists());
}

#[tokio::test]
async fn plain_text_is_cached_verbatim() {
    let server = MockServer::start().await;
    let text = "Plain text notes. ".repeat(10);
    Mock::given(path("/notes.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(text.clone(), "text/plain"))
        .mount(&server)
        .await;

    let cache_dir = tempfile::tempdir().unwrap();
    let config = ServerConfig::new(cache_dir.path());
    let cache = CacheIndex::new(cache_dir.path());
    let page_url = url(&format!("{}/notes.txt", server.uri()));

    let FetchResult::Cached(written) = http_fetcher(&config).fetch_url(&page_url, &cache).await.unwrap() else {
        panic!("expected a cached page");
    };
    let content = std::fs::read_to_string(written).unwrap();
    assert!(content.starts_with(text.trim()));
}

#[tokio::test]
async fn error_status_is_reported_and_nothing_is_cached() {
    let server = MockServer::start().await;
    Mock::given(path("/gone"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;

    let cache_dir = tempfile::tempdir().unwrap();
    let config = ServerConfig::new(cache_dir.path());
    let cache = CacheIndex::new(cache_dir.path());

    let err = http_fetcher(&config)
        .fetch_url(&url(&format!("{}/gone", server.uri())), &cache)
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Status { status: 410, .. }), "got {err:?}");
    assert!(files_under(cache_dir.path()).is_empty());
}

#[tokio::test]
async fn pdf_is_unsupported() {
    let server = MockServer::start().await;
    Mock::given(path("/paper.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"%PDF-1.7".to_vec(), "application/pdf"))
        .mount(&server)
        .await;

    let cache_dir = tempfile::tempdir().unwrap();
    let config = ServerConfig::new(cache_dir.path());
    let cache = CacheIndex::new(cache_dir.path());

    let err = http_fetcher(&config)
        .fetch_url(&url(&format!("{}/paper.pdf", server.uri())), &cache)
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::UnsupportedContent { .. }), "got {err:?}");
}

#[tokio::test]
async fn external_urls_never_reach_the_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let cache_dir = tempfile::tempdir().unwrap();
    let config = ServerConfig::new(cache_dir.path());
    let cache = CacheIndex::new(cache_dir.path());

    let result = http_fetcher(&config)
        .fetch_url(&url("https://youtu.be/abc123"), &cache)
        .await
        .unwrap();

    assert!(result.is_external());
}

// ---------------------------------------------------------------------------
// timeout
// ---------------------------------------------------------------------------

struct HangingSource;

#[async_trait]
impl PageSource for HangingSource {
    async fn fetch(&self, _url: &Url) -> Result<Page, FetchError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        unreachable!("fetch should have been cancelled")
    }
}

#[tokio::test]
async fn slow_fetch_times_out() {
    let cache_dir = tempfile::tempdir().unwrap();
    let config = ServerConfig::new(cache_dir.path()).with_fetch_timeout(Duration::from_millis(50));
    let cache = CacheIndex::new(cache_dir.path());
    let fetcher = ContentFetcher::new(Arc::new(HangingSource), &config);

    let err = fetcher
        .fetch_url(&url("https://slow.example.com/"), &cache)
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Timeout(d) if d == Duration::from_millis(50)));
    assert!(files_under(cache_dir.path()).is_empty());
}
