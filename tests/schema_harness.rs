//! Wire-shape checks: every kind of message the server writes must match
//! the frozen JSON Schemas.

use crawl_ls::protocol::{JsonRpcError, JsonRpcNotification, JsonRpcResponse, RpcId};
use crawl_ls::schema::{validate_json, validate_value, RESPONSE_SCHEMA, SHOW_DOCUMENT_SCHEMA};
use serde_json::json;
use url::Url;

#[test]
fn json_schema_harness_validates_instance() {
    let schema = r#"{
      "$schema": "https://json-schema.org/draft/2020-12/schema",
      "type": "object",
      "required": ["uri"],
      "properties": { "uri": { "type": "string", "minLength": 1 } }
    }"#;

    validate_json(schema, r#"{"uri": "file:///tmp/a.md"}"#).expect("schema validation failed");
    assert!(validate_json(schema, r#"{"uri": ""}"#).is_err());
}

#[test]
fn success_responses_match_schema() {
    let location = json!({
        "uri": "file:///tmp/crawl-ls/example.com/index.md",
        "range": {"start": {"line": 0, "character": 0}, "end": {"line": 0, "character": 0}}
    });

    for resp in [
        JsonRpcResponse::success(Some(RpcId::Number(1)), location),
        JsonRpcResponse::success(Some(RpcId::Str("abc".into())), serde_json::Value::Null),
        JsonRpcResponse::success(None, json!({"capabilities": {"definitionProvider": true}})),
    ] {
        resp.validate().unwrap();
        let value = serde_json::to_value(&resp).unwrap();
        validate_value(RESPONSE_SCHEMA, &value).unwrap_or_else(|e| panic!("{value}: {e}"));
    }
}

#[test]
fn error_responses_match_schema() {
    for err in [
        JsonRpcError::method_not_found("textDocument/hover"),
        JsonRpcError::internal_error(),
    ] {
        let resp = JsonRpcResponse::error(Some(RpcId::Number(9)), err);
        resp.validate().unwrap();
        let value = serde_json::to_value(&resp).unwrap();
        validate_value(RESPONSE_SCHEMA, &value).unwrap_or_else(|e| panic!("{value}: {e}"));
    }
}

#[test]
fn null_success_keeps_result_member() {
    let resp = JsonRpcResponse::success(Some(RpcId::Number(2)), serde_json::Value::Null);
    let text = serde_json::to_string(&resp).unwrap();
    assert_eq!(text, r#"{"jsonrpc":"2.0","id":2,"result":null}"#);
}

#[test]
fn malformed_responses_fail_both_checks() {
    let both = JsonRpcResponse {
        jsonrpc: "2.0".into(),
        id: Some(RpcId::Number(1)),
        result: Some(json!(1)),
        error: Some(JsonRpcError::internal_error()),
    };
    assert!(both.validate().is_err());
    assert!(validate_value(RESPONSE_SCHEMA, &serde_json::to_value(&both).unwrap()).is_err());

    let neither = JsonRpcResponse {
        jsonrpc: "2.0".into(),
        id: Some(RpcId::Number(1)),
        result: None,
        error: None,
    };
    assert!(neither.validate().is_err());
    assert!(validate_value(RESPONSE_SCHEMA, &serde_json::to_value(&neither).unwrap()).is_err());

    let blank = JsonRpcResponse::error(
        Some(RpcId::Number(1)),
        JsonRpcError {
            code: -32603,
            message: String::new(),
            data: None,
        },
    );
    assert!(blank.validate().is_err());
    assert!(validate_value(RESPONSE_SCHEMA, &serde_json::to_value(&blank).unwrap()).is_err());
}

#[test]
fn show_document_matches_schema() {
    let note = JsonRpcNotification::show_external(&Url::parse("https://youtu.be/abc123").unwrap());
    let value = serde_json::to_value(&note).unwrap();
    validate_value(SHOW_DOCUMENT_SCHEMA, &value).unwrap_or_else(|e| panic!("{value}: {e}"));
    assert!(value.get("id").is_none());
}
