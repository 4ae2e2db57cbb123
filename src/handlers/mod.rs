pub mod definition;
pub mod initialize;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::config::ServerContext;
use crate::protocol::{JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, RpcId};

use self::definition::Resolution;

/// The fixed set of methods this server understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Initialize,
    Initialized,
    Definition,
    Shutdown,
    Exit,
}

impl Method {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "initialize" => Some(Self::Initialize),
            "initialized" => Some(Self::Initialized),
            "textDocument/definition" => Some(Self::Definition),
            "shutdown" => Some(Self::Shutdown),
            "exit" => Some(Self::Exit),
            _ => None,
        }
    }
}

/// Everything handling one message produces, in write order: notifications
/// first, then the response.
#[derive(Debug, Default)]
pub struct Outcome {
    pub notifications: Vec<JsonRpcNotification>,
    pub response: Option<JsonRpcResponse>,
    /// The client asked the server to stop.
    pub exit: bool,
}

impl Outcome {
    fn respond(response: JsonRpcResponse) -> Self {
        Self {
            response: Some(response),
            ..Self::default()
        }
    }
}

/// Decode, validate and dispatch one raw message body.
///
/// Undecodable or malformed messages are logged and dropped: no response is
/// produced because the id cannot be trusted. Notifications are dispatched
/// but never answered. A response that fails its own shape check is dropped.
pub async fn handle_message(raw: &[u8], ctx: &ServerContext) -> Outcome {
    let value: Value = match serde_json::from_slice(raw) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "dropping undecodable message");
            return Outcome::default();
        }
    };

    let req = match JsonRpcRequest::from_value(value) {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "dropping invalid JSON-RPC request");
            return Outcome::default();
        }
    };

    debug!(method = %req.method, id = ?req.id, "received");
    let mut outcome = dispatch(&req, ctx).await;

    if req.is_notification() && outcome.response.take().is_some() {
        debug!(method = %req.method, "not answering notification");
    }

    if let Some(resp) = &outcome.response {
        if let Err(e) = resp.validate() {
            error!(error = %e, method = %req.method, "refusing to send malformed response");
            outcome.response = None;
        }
    }

    outcome
}

/// Dispatch a validated JSON-RPC request to the appropriate handler.
pub async fn dispatch(req: &JsonRpcRequest, ctx: &ServerContext) -> Outcome {
    let Some(method) = Method::from_name(&req.method) else {
        return Outcome::respond(JsonRpcResponse::error(
            req.id.clone(),
            JsonRpcError::method_not_found(&req.method),
        ));
    };

    match method {
        Method::Initialize => Outcome::respond(success(req.id.clone(), &initialize::handle())),

        Method::Initialized => Outcome::default(),

        Method::Shutdown => Outcome::respond(JsonRpcResponse::success(req.id.clone(), Value::Null)),

        Method::Exit => Outcome {
            exit: true,
            ..Outcome::default()
        },

        Method::Definition => match definition::handle(req.params.as_ref(), ctx).await {
            Ok(resolution) => {
                let mut outcome = match resolution.to_result() {
                    Ok(result) => Outcome::respond(JsonRpcResponse::success(req.id.clone(), result)),
                    Err(e) => internal_error(req, &e),
                };
                if let Resolution::External(url) = &resolution {
                    outcome.notifications.push(JsonRpcNotification::show_external(url));
                }
                outcome
            }
            Err(e) => internal_error(req, &e),
        },
    }
}

fn success<T: Serialize>(id: Option<RpcId>, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => {
            error!(error = %e, "result serialization failed");
            JsonRpcResponse::error(id, JsonRpcError::internal_error())
        }
    }
}

/// Log the full error chain locally; answer with the generic message only.
fn internal_error(req: &JsonRpcRequest, err: &dyn std::error::Error) -> Outcome {
    let mut chain = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        chain.push_str(": ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    error!(method = %req.method, id = ?req.id, error = %chain, "handler failed");
    Outcome::respond(JsonRpcResponse::error(req.id.clone(), JsonRpcError::internal_error()))
}
