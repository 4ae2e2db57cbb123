use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::CacheIndex;
use crate::error::FetchError;
use crate::fetcher::{
    default_external_rules, ContentFetcher, ExternalRule, HttpPageSource, PageSource,
    DEFAULT_MIN_CONTENT_CHARS,
};

/// Cache root used when none is configured.
pub const DEFAULT_CACHE_DIR: &str = "/tmp/crawl-ls";

/// Default upper bound for a single page fetch (30 seconds).
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Server configuration, fixed at start-up.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub cache_dir: PathBuf,
    pub fetch_timeout: Duration,
    pub min_content_chars: usize,
    pub external_rules: Vec<ExternalRule>,
}

impl ServerConfig {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            min_content_chars: DEFAULT_MIN_CONTENT_CHARS,
            external_rules: default_external_rules(),
        }
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_DIR)
    }
}

/// Everything a handler needs, built once and passed by reference.
pub struct ServerContext {
    pub config: ServerConfig,
    pub cache: CacheIndex,
    pub fetcher: ContentFetcher,
}

impl ServerContext {
    /// Build a context around an arbitrary page backend.
    pub fn new(config: ServerConfig, source: Arc<dyn PageSource>) -> Self {
        let cache = CacheIndex::new(config.cache_dir.clone());
        let fetcher = ContentFetcher::new(source, &config);
        Self {
            config,
            cache,
            fetcher,
        }
    }

    /// Build a context that fetches pages over HTTP.
    pub fn with_http(config: ServerConfig) -> Result<Self, FetchError> {
        let source = HttpPageSource::new(config.fetch_timeout)?;
        Ok(Self::new(config, Arc::new(source)))
    }
}
