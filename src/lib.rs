//! Language server that turns links into local documents.
//!
//! `textDocument/definition` on a web link fetches the page once, stores a
//! markdown rendition under the cache directory, and answers with the cached
//! file's location. Links to pages that only make sense in a browser (video
//! sites, near-empty pages) are handed back to the client with
//! `window/showDocument` instead.
//!
//! Transport is JSON-RPC 2.0 with `Content-Length` framing on stdio.

pub mod cache;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod handlers;
pub mod link;
pub mod protocol;
pub mod server;
pub mod transport;

pub mod schema;
