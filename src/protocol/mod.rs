pub mod notification;
pub mod request;
pub mod response;

pub use notification::JsonRpcNotification;
pub use request::{DefinitionParams, JsonRpcRequest, RpcId, ShapeError, JSONRPC_VERSION};
pub use response::{JsonRpcError, JsonRpcResponse};
