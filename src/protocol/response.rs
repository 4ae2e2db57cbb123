use serde::{Deserialize, Serialize};

use super::request::{RpcId, ShapeError, JSONRPC_VERSION};

/// JSON-RPC 2.0 response envelope.
///
/// `id` is always serialized (`null` when the request id is unknown) and
/// exactly one of `result` / `error` is present. A success without payload
/// carries `Some(Value::Null)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Option<RpcId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<RpcId>, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<RpcId>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Check the outgoing shape. Anything failing here must not be written.
    pub fn validate(&self) -> Result<(), ShapeError> {
        if self.jsonrpc != JSONRPC_VERSION {
            return Err(ShapeError::Version);
        }
        match (&self.result, &self.error) {
            (Some(_), None) => Ok(()),
            (None, Some(err)) if err.message.is_empty() => Err(ShapeError::EmptyErrorMessage),
            (None, Some(_)) => Ok(()),
            _ => Err(ShapeError::ResultXorError),
        }
    }
}

/// JSON-RPC 2.0 error object (protocol-level errors).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcError {
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INTERNAL_ERROR: i32 = -32603;

    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: Self::METHOD_NOT_FOUND,
            message: format!("Method not found: {method}"),
            data: None,
        }
    }

    /// Generic internal error. Never carries handler detail.
    pub fn internal_error() -> Self {
        Self {
            code: Self::INTERNAL_ERROR,
            message: "Internal error".into(),
            data: None,
        }
    }
}
