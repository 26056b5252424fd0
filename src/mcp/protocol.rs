//! Newline-delimited [JSON-RPC 2.0](https://www.jsonrpc.org/specification) messages.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const SERVER_NAME: &str = "mcp-charging-advisor";

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
}

/// Incoming request, or a notification when the ID is missing.
#[derive(Debug, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub id: Option<RequestId>,

    pub method: String,

    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Deserialize)]
pub struct CallToolParams {
    pub name: String,

    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Deserialize)]
pub struct CancelledParams {
    #[serde(rename = "requestId")]
    pub request_id: RequestId,

    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Response {
    jsonrpc: &'static str,

    /// `null` when the request could not be parsed.
    id: Option<RequestId>,

    #[serde(flatten)]
    outcome: Outcome,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum Outcome {
    Result(Value),
    Error(ErrorObject),
}

impl Response {
    pub fn result(id: RequestId, result: Value) -> Self {
        Self { jsonrpc: "2.0", id: Some(id), outcome: Outcome::Result(result) }
    }

    pub fn error(id: Option<RequestId>, error: ErrorObject) -> Self {
        Self { jsonrpc: "2.0", id, outcome: Outcome::Error(error) }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorObject {
    code: i32,
    message: String,
}

impl ErrorObject {
    pub fn parse_error(error: &serde_json::Error) -> Self {
        Self { code: -32700, message: format!("Parse error: {error}") }
    }

    pub fn invalid_request(error: &serde_json::Error) -> Self {
        Self { code: -32600, message: format!("Invalid Request: {error}") }
    }

    pub fn duplicate_id() -> Self {
        Self { code: -32600, message: "Invalid Request: request ID is already in flight".into() }
    }

    pub fn method_not_found(method: &str) -> Self {
        Self { code: -32601, message: format!("Method not found: {method}") }
    }

    pub fn invalid_params(error: &serde_json::Error) -> Self {
        Self { code: -32602, message: format!("Invalid params: {error}") }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self { code: -32603, message: message.into() }
    }
}

/// Result of the `initialize` handshake.
pub fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {"tools": {}},
        "serverInfo": {"name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION")},
    })
}

/// Result of `tools/call`: a single text item.
#[must_use]
#[derive(Debug, Serialize)]
pub struct CallToolResult {
    content: Vec<TextContent>,

    #[serde(rename = "isError")]
    is_error: bool,
}

#[derive(Debug, Serialize)]
struct TextContent {
    #[serde(rename = "type")]
    kind: &'static str,

    text: String,
}

impl CallToolResult {
    pub fn text(text: String) -> Self {
        Self { content: vec![TextContent { kind: "text", text }], is_error: false }
    }

    pub fn error(text: String) -> Self {
        Self { content: vec![TextContent { kind: "text", text }], is_error: true }
    }
}
