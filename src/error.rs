use std::path::PathBuf;
use std::time::Duration;

/// Failures while reading or writing framed messages.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The header block carried no usable `Content-Length`.
    #[error("framing error: {0}")]
    Framing(String),

    /// Serializing an outgoing message failed.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The underlying byte stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of the on-disk cache index.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The URL has no host component and cannot be keyed.
    #[error("URL cannot be cached (no host): {0}")]
    Unkeyable(String),

    #[error("cannot stat {path}: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures of the content fetcher.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("{url} has unsupported content type {content_type}")]
    UnsupportedContent { url: String, content_type: String },

    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Failures while resolving a definition request.
///
/// Every variant maps to a `-32603` response; the detail is logged only.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("invalid definition params: {0}")]
    InvalidParams(#[from] serde_json::Error),

    #[error("document URI is not a local file: {0}")]
    NotAFile(String),

    #[error("cannot read document {path}: {source}")]
    ReadDocument {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The cache file cannot be expressed as a `file://` URI (relative root).
    #[error("cache path is not absolute: {0}")]
    CachePath(PathBuf),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}
