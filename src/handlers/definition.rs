//! `textDocument/definition`: link under cursor → cached markdown file.

use lsp_types::{Location, Position, Range};
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use crate::config::ServerContext;
use crate::error::ResolveError;
use crate::fetcher::FetchResult;
use crate::link::extract_link_at_position;
use crate::protocol::DefinitionParams;

/// What a definition request resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The cached copy of the linked page.
    Location(Location),
    /// The link must be opened by the client; the response carries `null`.
    External(Url),
    /// No link at the cursor (or the line does not exist).
    NotFound,
}

impl Resolution {
    /// The `result` payload of the response.
    pub fn to_result(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::Location(location) => serde_json::to_value(location),
            Self::External(_) | Self::NotFound => Ok(Value::Null),
        }
    }
}

/// Handle a `textDocument/definition` request.
pub async fn handle(params: Option<&Value>, ctx: &ServerContext) -> Result<Resolution, ResolveError> {
    let params: DefinitionParams = serde_json::from_value(params.cloned().unwrap_or(Value::Null))?;
    let at = params.text_document_position_params;
    resolve(&at.text_document.uri, at.position, ctx).await
}

/// Resolve the link at `position` in the document at `document_uri`.
///
/// Steps run strictly in order and each is attempted once: read the document,
/// find the link, check the cache, fetch on a miss.
pub async fn resolve(
    document_uri: &Url,
    position: Position,
    ctx: &ServerContext,
) -> Result<Resolution, ResolveError> {
    let path = document_uri
        .to_file_path()
        .map_err(|()| ResolveError::NotAFile(document_uri.to_string()))?;
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|source| ResolveError::ReadDocument {
            path: path.clone(),
            source,
        })?;
    // Invalid bytes on one line must not hide links on the others.
    let content = String::from_utf8_lossy(&bytes);

    let Some(line) = content.lines().nth(position.line as usize) else {
        debug!(line = position.line, "position is past the end of the document");
        return Ok(Resolution::NotFound);
    };

    let Some(target) = extract_link_at_position(line, position.character) else {
        debug!(line = position.line, character = position.character, "no link at cursor");
        return Ok(Resolution::NotFound);
    };
    let Ok(url) = Url::parse(&target) else {
        return Ok(Resolution::NotFound);
    };

    let cache_path = ctx.cache.path_for(&url)?;
    let cache_path = if ctx.cache.exists(&cache_path).await? {
        info!(%url, path = %cache_path.display(), "cache hit");
        cache_path
    } else {
        match ctx.fetcher.fetch_url(&url, &ctx.cache).await? {
            FetchResult::External => {
                info!(%url, "asking client to open link externally");
                return Ok(Resolution::External(url));
            }
            FetchResult::Cached(path) => path,
        }
    };

    let uri = Url::from_file_path(&cache_path).map_err(|()| ResolveError::CachePath(cache_path.clone()))?;
    Ok(Resolution::Location(Location {
        uri,
        range: Range::new(Position::new(0, 0), Position::new(0, 0)),
    }))
}
