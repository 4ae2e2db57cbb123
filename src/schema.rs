//! JSON Schema checks for the messages this server writes.
//!
//! The schemas pin the wire shape of responses and notifications; the tests
//! run every outgoing message through them.

use jsonschema::validator_for;
use serde_json::Value;

/// A JSON-RPC 2.0 response: `id` always present, exactly one of
/// `result`/`error`.
pub const RESPONSE_SCHEMA: &str = r#"{
  "$schema": "https://json-schema.org/draft/2020-12/schema",
  "title": "JSON-RPC 2.0 response",
  "type": "object",
  "required": ["jsonrpc", "id"],
  "additionalProperties": false,
  "properties": {
    "jsonrpc": { "const": "2.0" },
    "id": { "type": ["integer", "string", "null"] },
    "result": true,
    "error": {
      "type": "object",
      "required": ["code", "message"],
      "additionalProperties": false,
      "properties": {
        "code": { "type": "integer" },
        "message": { "type": "string", "minLength": 1 },
        "data": true
      }
    }
  },
  "oneOf": [
    { "required": ["result"], "not": { "required": ["error"] } },
    { "required": ["error"], "not": { "required": ["result"] } }
  ]
}"#;

/// The `window/showDocument` notification sent for external links.
pub const SHOW_DOCUMENT_SCHEMA: &str = r#"{
  "$schema": "https://json-schema.org/draft/2020-12/schema",
  "title": "window/showDocument notification",
  "type": "object",
  "required": ["jsonrpc", "method", "params"],
  "additionalProperties": false,
  "properties": {
    "jsonrpc": { "const": "2.0" },
    "method": { "const": "window/showDocument" },
    "params": {
      "type": "object",
      "required": ["uri", "external"],
      "properties": {
        "uri": { "type": "string", "pattern": "^https?://" },
        "external": { "const": true }
      }
    }
  }
}"#;

#[derive(Debug, thiserror::Error)]
pub enum SchemaValidationError {
    #[error("schema parse error: {0}")]
    SchemaParse(#[from] serde_json::Error),
    #[error("schema compile error: {0}")]
    SchemaCompile(String),
    #[error("instance validation failed: {0}")]
    ValidationFailed(String),
}

/// Validate a JSON instance against a JSON Schema (draft 2020-12).
pub fn validate_json(schema_str: &str, instance_str: &str) -> Result<(), SchemaValidationError> {
    let instance: Value = serde_json::from_str(instance_str)?;
    validate_value(schema_str, &instance)
}

/// Validate an already-parsed instance. The first violation is reported.
pub fn validate_value(schema_str: &str, instance: &Value) -> Result<(), SchemaValidationError> {
    let schema: Value = serde_json::from_str(schema_str)?;
    let validator =
        validator_for(&schema).map_err(|e| SchemaValidationError::SchemaCompile(e.to_string()))?;

    let first = validator.iter_errors(instance).next().map(|e| e.to_string());
    match first {
        None => Ok(()),
        Some(err) => Err(SchemaValidationError::ValidationFailed(err)),
    }
}
