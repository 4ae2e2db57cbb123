use lsp_types::{InitializeResult, OneOf, ServerCapabilities, ServerInfo};

/// Handle `initialize`: the server only ever offers go-to-definition.
pub fn handle() -> InitializeResult {
    InitializeResult {
        capabilities: ServerCapabilities {
            definition_provider: Some(OneOf::Left(true)),
            ..ServerCapabilities::default()
        },
        server_info: Some(ServerInfo {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
        }),
    }
}
