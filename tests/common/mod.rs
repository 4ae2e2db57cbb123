//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use crawl_ls::config::{ServerConfig, ServerContext};
use crawl_ls::error::FetchError;
use crawl_ls::fetcher::{Page, PageSource};
use serde_json::{json, Value};
use url::Url;

/// Long enough to pass the minimum content check once converted.
pub const ARTICLE_HTML: &str = "<html><head><title>Ownership</title></head><body>\
    <nav>Home | Docs</nav>\
    <main><p>Ownership is a set of rules that govern how a Rust program manages memory. \
    Some languages have garbage collection that regularly looks for no-longer-used memory.</p></main>\
    </body></html>";

/// Serves canned pages and records every URL it is asked for.
#[derive(Default)]
pub struct StubSource {
    pages: Vec<(String, Page)>,
    requests: Mutex<Vec<String>>,
}

impl StubSource {
    pub fn with_page(mut self, url: &str, content_type: &str, body: &str) -> Self {
        self.pages.push((
            url.to_string(),
            Page {
                content_type: Some(content_type.to_string()),
                body: body.to_string(),
            },
        ));
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageSource for StubSource {
    async fn fetch(&self, url: &Url) -> Result<Page, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        self.pages
            .iter()
            .find(|(u, _)| u == url.as_str())
            .map(|(_, page)| page.clone())
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

pub fn test_context(cache_dir: &Path, source: Arc<StubSource>) -> ServerContext {
    ServerContext::new(ServerConfig::new(cache_dir), source)
}

/// Write `content` as `notes.md` under `dir` and return its `file://` URI.
pub fn write_document(dir: &Path, content: &str) -> (PathBuf, Url) {
    let path = dir.join("notes.md");
    std::fs::write(&path, content).unwrap();
    let uri = Url::from_file_path(&path).unwrap();
    (path, uri)
}

pub fn definition_request(id: i64, uri: &Url, line: u32, character: u32) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "textDocument/definition",
        "params": {
            "textDocument": { "uri": uri.as_str() },
            "position": { "line": line, "character": character }
        }
    })
}

/// Every regular file under `dir`, recursively.
pub fn files_under(dir: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let Ok(entries) = std::fs::read_dir(dir) else {
        return out;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            out.extend(files_under(&path));
        } else {
            out.push(path);
        }
    }
    out.sort();
    out
}
