//! Turning a URL into a cached markdown file.
//!
//! The fetcher classifies a URL first: video hosts and similar sites are
//! reported as external and never touched. Everything else is retrieved
//! through a [`PageSource`], converted to markdown, checked for a minimum
//! amount of content and written to the path the [`CacheIndex`] assigns.

pub mod http;
pub mod markdown;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};
use url::Url;

use crate::cache::CacheIndex;
use crate::config::ServerConfig;
use crate::error::{CacheError, FetchError};

pub use http::HttpPageSource;

/// Pages whose rendered text is shorter than this did not render meaningfully.
pub const DEFAULT_MIN_CONTENT_CHARS: usize = 100;

/// A retrieved page before conversion.
#[derive(Debug, Clone)]
pub struct Page {
    /// Media type without parameters, lower-cased (e.g. `text/html`).
    pub content_type: Option<String>,
    pub body: String,
}

/// Backend that retrieves raw page content.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Page, FetchError>;
}

/// Outcome of [`ContentFetcher::fetch_url`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult {
    /// Must be opened by the client; nothing was cached.
    External,
    /// Content was converted and written to this cache file.
    Cached(PathBuf),
}

impl FetchResult {
    pub fn is_external(&self) -> bool {
        matches!(self, Self::External)
    }
}

/// Which paths on a host are external-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathMatch {
    Any,
    Prefixes(Vec<String>),
    /// First path segment is all digits (e.g. `vimeo.com/123456`).
    NumericId,
}

/// A denylist entry: `domain` and its sub-domains, restricted by `paths`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalRule {
    pub domain: String,
    pub paths: PathMatch,
}

impl ExternalRule {
    pub fn new(domain: impl Into<String>, paths: PathMatch) -> Self {
        Self {
            domain: domain.into(),
            paths,
        }
    }

    pub fn matches(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.trim_end_matches('.');
        let on_domain = host == self.domain
            || host
                .strip_suffix(self.domain.as_str())
                .is_some_and(|prefix| prefix.ends_with('.'));
        if !on_domain {
            return false;
        }

        match &self.paths {
            PathMatch::Any => true,
            PathMatch::Prefixes(prefixes) => prefixes.iter().any(|p| url.path().starts_with(p.as_str())),
            PathMatch::NumericId => url
                .path_segments()
                .and_then(|mut s| s.next())
                .is_some_and(|first| !first.is_empty() && first.bytes().all(|b| b.is_ascii_digit())),
        }
    }
}

/// Video hosting pages that cannot be rendered as markdown.
pub fn default_external_rules() -> Vec<ExternalRule> {
    let prefixes = |ps: &[&str]| PathMatch::Prefixes(ps.iter().map(|p| p.to_string()).collect());
    vec![
        ExternalRule::new("youtube.com", prefixes(&["/watch", "/shorts/", "/live/", "/embed/"])),
        ExternalRule::new("youtu.be", PathMatch::Any),
        ExternalRule::new("vimeo.com", PathMatch::NumericId),
        ExternalRule::new("twitch.tv", PathMatch::Any),
    ]
}

pub fn is_external_url(url: &Url, rules: &[ExternalRule]) -> bool {
    rules.iter().any(|rule| rule.matches(url))
}

/// Whether converted content is too short to be a useful page.
///
/// Counts characters of the trimmed text.
pub fn is_content_too_short(content: &str, min_chars: usize) -> bool {
    content.trim().chars().count() < min_chars
}

/// Fetches, converts and persists pages.
pub struct ContentFetcher {
    source: Arc<dyn PageSource>,
    rules: Vec<ExternalRule>,
    min_content_chars: usize,
    timeout: Duration,
}

impl ContentFetcher {
    pub fn new(source: Arc<dyn PageSource>, config: &ServerConfig) -> Self {
        Self {
            source,
            rules: config.external_rules.clone(),
            min_content_chars: config.min_content_chars,
            timeout: config.fetch_timeout,
        }
    }

    pub fn is_external(&self, url: &Url) -> bool {
        is_external_url(url, &self.rules)
    }

    /// Classify `url` and, when fetchable, retrieve it into `cache`.
    ///
    /// Pages that render below the minimum length are reported as external
    /// so the client opens the original instead of an empty stub. Network,
    /// status and conversion failures are errors; no cache file is written.
    pub async fn fetch_url(&self, url: &Url, cache: &CacheIndex) -> Result<FetchResult, FetchError> {
        if self.is_external(url) {
            info!(%url, "external-only URL");
            return Ok(FetchResult::External);
        }

        let page = tokio::time::timeout(self.timeout, self.source.fetch(url))
            .await
            .map_err(|_| FetchError::Timeout(self.timeout))??;

        let body = to_markdown(&page, url)?;
        if is_content_too_short(&body, self.min_content_chars) {
            info!(%url, chars = body.trim().chars().count(), "content too short, deferring to client");
            return Ok(FetchResult::External);
        }

        let document = decorate(&body, &page, url);
        let path = cache.path_for(url)?;
        write_entry(&path, &document).await?;
        info!(%url, path = %path.display(), bytes = document.len(), "cached page");
        Ok(FetchResult::Cached(path))
    }
}

fn is_html(page: &Page) -> bool {
    match page.content_type.as_deref() {
        Some(ct) => ct.contains("html"),
        None => page.body.trim_start().starts_with('<'),
    }
}

fn to_markdown(page: &Page, url: &Url) -> Result<String, FetchError> {
    if is_html(page) {
        return Ok(markdown::html_to_markdown(&page.body, url));
    }

    match page.content_type.as_deref() {
        None | Some("text/plain" | "text/markdown" | "text/x-markdown") => Ok(page.body.clone()),
        Some(other) => Err(FetchError::UnsupportedContent {
            url: url.to_string(),
            content_type: other.to_string(),
        }),
    }
}

/// Prefix the page title when the body has no heading and record the source.
fn decorate(body: &str, page: &Page, url: &Url) -> String {
    let body = body.trim();
    let title = if is_html(page) {
        markdown::html_title(&page.body)
    } else {
        None
    };

    let mut out = String::with_capacity(body.len() + 128);
    if let Some(title) = title.filter(|_| !body.starts_with("# ")) {
        out.push_str("# ");
        out.push_str(&title);
        out.push_str("\n\n");
    }
    out.push_str(body);
    out.push_str("\n\n---\n\nSource: <");
    out.push_str(url.as_str());
    out.push_str(">\n");
    out
}

/// Write `content` to `path`, creating parent directories. The file appears
/// atomically so a concurrent existence check never sees a partial entry.
async fn write_entry(path: &Path, content: &str) -> Result<(), CacheError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(write_err(parent))?;
    }
    let partial = path.with_extension("md.partial");
    tokio::fs::write(&partial, content).await.map_err(write_err(&partial))?;
    tokio::fs::rename(&partial, path).await.map_err(write_err(path))?;
    debug!(path = %path.display(), "wrote cache entry");
    Ok(())
}

fn write_err(path: &Path) -> impl FnOnce(std::io::Error) -> CacheError {
    let path = path.to_path_buf();
    move |source| CacheError::Write { path, source }
}
