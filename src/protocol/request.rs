use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol tag every message must carry.
pub const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC 2.0 request id: a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcId {
    Number(i64),
    Str(String),
}

/// A message that does not have the shape of a JSON-RPC 2.0 envelope.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    #[error("message is not a JSON object")]
    NotAnObject,
    #[error("`jsonrpc` must be \"2.0\"")]
    Version,
    #[error("`method` must be a string")]
    Method,
    #[error("`id` must be an integer or a string")]
    Id,
    #[error("`params` must be an object or an array")]
    Params,
    #[error("response must carry exactly one of `result` and `error`")]
    ResultXorError,
    #[error("error `message` must not be empty")]
    EmptyErrorMessage,
}

/// JSON-RPC 2.0 request envelope.
///
/// A request without `id` is a notification and is never answered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RpcId>,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Check a decoded JSON value against the request shape and take it apart.
    pub fn from_value(value: Value) -> Result<Self, ShapeError> {
        let Value::Object(mut fields) = value else {
            return Err(ShapeError::NotAnObject);
        };

        match fields.get("jsonrpc") {
            Some(Value::String(v)) if v == JSONRPC_VERSION => {}
            _ => return Err(ShapeError::Version),
        }

        let method = match fields.remove("method") {
            Some(Value::String(m)) => m,
            _ => return Err(ShapeError::Method),
        };

        let id = match fields.remove("id") {
            None => None,
            Some(Value::String(s)) => Some(RpcId::Str(s)),
            Some(Value::Number(n)) => Some(RpcId::Number(n.as_i64().ok_or(ShapeError::Id)?)),
            Some(_) => return Err(ShapeError::Id),
        };

        let params = match fields.remove("params") {
            None => None,
            Some(p @ (Value::Object(_) | Value::Array(_))) => Some(p),
            Some(_) => return Err(ShapeError::Params),
        };

        Ok(Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id,
            method,
            params,
        })
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// Parameters of `textDocument/definition`.
pub type DefinitionParams = lsp_types::GotoDefinitionParams;
