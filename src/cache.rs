//! URL → cache file identity.
//!
//! A cache entry is a markdown file under the cache root whose relative path
//! is derived from the URL: `host/path/segments.md`, plus the retained query
//! string (see [`cache_key`] for the escaping rules). The file existing *is*
//! the entry; nothing else is tracked.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use url::Url;

use crate::error::CacheError;

/// Query parameters that only identify where a visitor came from.
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_cid", "mc_eid", "ref", "ref_src"];
const TRACKING_PREFIX: &str = "utm_";

/// Components longer than this are replaced by their SHA-256 digest.
const MAX_SEGMENT_BYTES: usize = 200;

const INDEX_NAME: &str = "index";
const ESCAPED_INDEX_NAME: &str = "%69ndex";
const FILE_SUFFIX: &str = ".md";
const PORT_SEPARATOR: &str = "%3A";
const EMPTY_SEGMENT: &str = "%00";
const HASHED_MARKER: &str = "%23";

#[derive(Debug, Clone)]
pub struct CacheIndex {
    root: PathBuf,
}

impl CacheIndex {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the cache file for `url`. Pure: touches no filesystem state.
    pub fn path_for(&self, url: &Url) -> Result<PathBuf, CacheError> {
        let mut path = self.root.clone();
        for component in cache_key(url)? {
            path.push(component);
        }
        Ok(path)
    }

    /// Whether a cache file exists at `path`.
    ///
    /// "Not found" is a miss; any other stat failure is an error.
    pub async fn exists(&self, path: &Path) -> Result<bool, CacheError> {
        match tokio::fs::metadata(path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(CacheError::Stat {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

/// Relative path components of the cache file for `url`.
///
/// Distinct URLs get distinct files, and a file name is never also needed as
/// a directory name. A literal `%` is written `%25`, which leaves every other
/// `%XX` sequence free to act as a marker:
///
/// - `%3A` separates the host from an explicit port;
/// - `%00` stands for an empty path segment (`/a//b`);
/// - a directory segment ending in `.md` has that dot written as `%2E`;
/// - a trailing slash names the page `index`, so a literal last segment
///   `index` is written `%69ndex`;
/// - a component longer than 200 bytes becomes its SHA-256 digest plus `%23`.
///
/// The last component carries the retained query and the `.md` extension.
pub fn cache_key(url: &Url) -> Result<Vec<String>, CacheError> {
    let host = url
        .host_str()
        .filter(|h| !h.trim_matches('.').is_empty())
        .ok_or_else(|| CacheError::Unkeyable(url.to_string()))?
        .replace(':', PORT_SEPARATOR);

    let mut components = vec![match url.port() {
        Some(port) => format!("{host}{PORT_SEPARATOR}{port}"),
        None => host,
    }];

    let segments: Vec<&str> = url.path_segments().map(|s| s.collect()).unwrap_or_default();
    let (last, dirs): (&str, &[&str]) = match segments.split_last() {
        Some((last, dirs)) => (*last, dirs),
        None => ("", &[]),
    };
    components.extend(dirs.iter().map(|d| directory_name(d)));

    let mut file_name = match last {
        "" => INDEX_NAME.to_string(),
        INDEX_NAME => ESCAPED_INDEX_NAME.to_string(),
        other => escape_percent(other),
    };

    // Form encoding never emits a bare `?`, so the first one splits the name.
    if let Some(query) = retained_query(url) {
        file_name.push('?');
        file_name.push_str(&query);
    }

    components.push(file_name);
    for component in &mut components {
        if component.len() > MAX_SEGMENT_BYTES {
            *component = format!("{:x}{HASHED_MARKER}", Sha256::digest(component.as_bytes()));
        }
    }
    if let Some(last) = components.last_mut() {
        last.push_str(FILE_SUFFIX);
    }

    Ok(components)
}

fn escape_percent(segment: &str) -> String {
    segment.replace('%', "%25")
}

/// Directory names never end in the cache file suffix.
fn directory_name(segment: &str) -> String {
    if segment.is_empty() {
        return EMPTY_SEGMENT.to_string();
    }
    let mut name = escape_percent(segment);
    let dot = name
        .len()
        .checked_sub(FILE_SUFFIX.len())
        .filter(|&i| name.get(i..).is_some_and(|tail| tail.eq_ignore_ascii_case(FILE_SUFFIX)));
    if let Some(dot) = dot {
        name.replace_range(dot..dot + 1, "%2E");
    }
    name
}

/// Non-tracking query pairs, sorted and re-encoded; `None` when nothing is left.
fn retained_query(url: &Url) -> Option<String> {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if pairs.is_empty() {
        return None;
    }
    pairs.sort();

    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    serializer.extend_pairs(pairs);
    Some(serializer.finish())
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with(TRACKING_PREFIX) || TRACKING_PARAMS.contains(&key)
}
