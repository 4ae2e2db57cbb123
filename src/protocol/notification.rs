use serde::{Deserialize, Serialize};

use super::request::JSONRPC_VERSION;

/// One-way server-to-client message. Carries no `id` and expects no reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    pub method: String,
    pub params: serde_json::Value,
}

impl JsonRpcNotification {
    pub const SHOW_DOCUMENT: &'static str = "window/showDocument";

    /// Ask the client to open `uri` in its external viewer (usually a browser).
    pub fn show_external(uri: &url::Url) -> Self {
        let params = lsp_types::ShowDocumentParams {
            uri: uri.clone(),
            external: Some(true),
            take_focus: None,
            selection: None,
        };
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            method: Self::SHOW_DOCUMENT.into(),
            // ShowDocumentParams is plain data; serialization cannot fail.
            params: serde_json::to_value(params).unwrap_or_else(|_| {
                serde_json::json!({ "uri": uri.as_str(), "external": true })
            }),
        }
    }
}
