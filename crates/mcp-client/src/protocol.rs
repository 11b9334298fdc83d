//! JSON-RPC 2.0 envelopes and the MCP payloads the adapters exchange.
//!
//! Capability records (tools, resources, prompts, content blocks) are
//! passed through mostly untouched: each keeps the fields the CLI renders
//! and collects everything else into an `extra` map.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Protocol revision sent in every `initialize` request.
pub const PROTOCOL_VERSION: &str = "2025-03-26";

/// Client identity announced during the handshake.
pub const CLIENT_NAME: &str = "mcp-cli-adapter";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Requests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A JSON-RPC 2.0 request (has an `id`, expects a response).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC 2.0 notification (no `id`, fire-and-forget).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            method: method.into(),
            params: None,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Responses
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Check if the response represents an error.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Extract the result value, returning an error if the response is an error.
    pub fn into_result(self) -> Result<Value, JsonRpcError> {
        if let Some(err) = self.error {
            Err(err)
        } else {
            Ok(self.result.unwrap_or(Value::Null))
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JSON-RPC error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for JsonRpcError {}

/// Classification of one message received from a server.
#[derive(Debug)]
pub enum Incoming {
    /// A response to one of our requests.
    Response(JsonRpcResponse),
    /// A server-initiated request or notification (carries a `method`).
    ServerMessage(String),
    /// Anything that is not a JSON-RPC message.
    Unrecognized,
}

/// Classify a raw JSON payload received from a server.
///
/// Server-initiated requests also carry an `id`, so the `method` key is
/// checked before attempting to read the payload as a response.
pub fn classify_incoming(raw: &str) -> Incoming {
    let Ok(value) = serde_json::from_str::<Value>(raw) else {
        return Incoming::Unrecognized;
    };
    if let Some(method) = value.get("method").and_then(Value::as_str) {
        return Incoming::ServerMessage(method.to_owned());
    }
    match serde_json::from_value::<JsonRpcResponse>(value) {
        Ok(resp) => Incoming::Response(resp),
        Err(_) => Incoming::Unrecognized,
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Handshake payloads
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Name/version pair identifying a client or a server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Implementation {
    pub name: String,
    pub version: String,
}

/// Parameters for the `initialize` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub protocol_version: String,
    pub capabilities: Value,
    pub client_info: Implementation,
}

/// The result payload from `initialize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    #[serde(default)]
    pub protocol_version: String,
    #[serde(default)]
    pub capabilities: Value,
    pub server_info: Implementation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// Build the `initialize` request parameters.
pub fn initialize_params() -> InitializeParams {
    InitializeParams {
        protocol_version: PROTOCOL_VERSION.into(),
        capabilities: serde_json::json!({}),
        client_info: Implementation {
            name: CLIENT_NAME.into(),
            version: env!("CARGO_PKG_VERSION").into(),
        },
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tools
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A single tool definition returned by `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default = "default_schema")]
    pub input_schema: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Treat an explicit `null` like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn default_schema() -> Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListToolsResult {
    #[serde(default)]
    pub tools: Vec<Tool>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// A single content block in a tool result or prompt message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Base64 payload for `image` and `audio` blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Embedded resource for `resource` blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceContents>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The result payload from `tools/call`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    #[serde(default)]
    pub content: Vec<Content>,
    #[serde(default)]
    pub is_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Resources
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub uri: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResourcesResult {
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// One entry of a `resources/read` result: either `text` or base64 `blob`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContents {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReadResourceResult {
    #[serde(default)]
    pub contents: Vec<ResourceContents>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Prompts
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prompt {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub arguments: Vec<PromptArgument>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptArgument {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPromptsResult {
    #[serde(default)]
    pub prompts: Vec<Prompt>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptMessage {
    pub role: String,
    pub content: Content,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GetPromptResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub messages: Vec<PromptMessage>,
}

/// Arguments for `prompts/get` are string-valued by protocol.
pub type PromptArguments = HashMap<String, String>;

/// Arguments for `tools/call` are defined per tool by the server.
pub type ToolArguments = Map<String, Value>;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_request() {
        let req = JsonRpcRequest::new(1, "initialize", Some(serde_json::json!({ "protocolVersion": PROTOCOL_VERSION })));
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"jsonrpc\":\"2.0\""));
        assert!(json.contains("\"id\":1"));
        assert!(json.contains("\"method\":\"initialize\""));
    }

    #[test]
    fn serialize_request_without_params() {
        let req = JsonRpcRequest::new(2, "tools/list", None);
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("params"));
    }

    #[test]
    fn serialize_notification() {
        let notif = JsonRpcNotification::new("notifications/initialized");
        let json = serde_json::to_string(&notif).unwrap();
        assert!(json.contains("\"method\":\"notifications/initialized\""));
        assert!(!json.contains("\"id\""));
    }

    #[test]
    fn deserialize_error_response() {
        let raw = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"Method not found"}}"#;
        let resp: JsonRpcResponse = serde_json::from_str(raw).unwrap();
        assert!(resp.is_error());
        let err = resp.into_result().unwrap_err();
        assert_eq!(err.code, -32601);
        assert_eq!(format!("{err}"), "JSON-RPC error -32601: Method not found");
    }

    #[test]
    fn classify_distinguishes_server_requests_from_responses() {
        let server_req = r#"{"jsonrpc":"2.0","id":7,"method":"roots/list"}"#;
        assert!(matches!(classify_incoming(server_req), Incoming::ServerMessage(m) if m == "roots/list"));

        let notif = r#"{"jsonrpc":"2.0","method":"notifications/message","params":{}}"#;
        assert!(matches!(classify_incoming(notif), Incoming::ServerMessage(_)));

        let resp = r#"{"jsonrpc":"2.0","id":7,"result":{}}"#;
        assert!(matches!(classify_incoming(resp), Incoming::Response(r) if r.id == 7));

        assert!(matches!(classify_incoming("starting server..."), Incoming::Unrecognized));
        assert!(matches!(classify_incoming(r#"{"hello":1}"#), Incoming::Unrecognized));
    }

    #[test]
    fn initialize_params_carry_client_identity() {
        let params = initialize_params();
        assert_eq!(params.protocol_version, PROTOCOL_VERSION);
        assert_eq!(params.client_info.name, CLIENT_NAME);

        let json = serde_json::to_value(&params).unwrap();
        assert!(json.get("clientInfo").is_some());
        assert!(json.get("protocolVersion").is_some());
    }

    #[test]
    fn tool_keeps_unknown_fields() {
        let raw = r#"{
            "name": "read_file",
            "description": "Read a file",
            "inputSchema": { "type": "object", "properties": { "path": { "type": "string" } } },
            "annotations": { "readOnlyHint": true }
        }"#;
        let tool: Tool = serde_json::from_str(raw).unwrap();
        assert_eq!(tool.name, "read_file");
        assert_eq!(tool.extra["annotations"]["readOnlyHint"], true);
    }

    #[test]
    fn tool_missing_description_and_schema_default() {
        let result: ListToolsResult = serde_json::from_str(r#"{ "tools": [{ "name": "ping" }] }"#).unwrap();
        assert_eq!(result.tools[0].description, "");
        assert_eq!(result.tools[0].input_schema["type"], "object");
        assert!(result.next_cursor.is_none());
    }

    #[test]
    fn null_descriptions_read_as_empty() {
        let tools: ListToolsResult =
            serde_json::from_str(r#"{ "tools": [{ "name": "ping", "description": null }] }"#).unwrap();
        assert_eq!(tools.tools[0].description, "");

        let resources: ListResourcesResult =
            serde_json::from_str(r#"{ "resources": [{ "uri": "file:///a", "name": null, "description": null }] }"#)
                .unwrap();
        assert_eq!(resources.resources[0].name, "");
        assert_eq!(resources.resources[0].description, "");

        let raw = r#"{ "prompts": [{
            "name": "review",
            "description": null,
            "arguments": [{ "name": "lang", "description": null, "required": null }]
        }] }"#;
        let prompts: ListPromptsResult = serde_json::from_str(raw).unwrap();
        assert_eq!(prompts.prompts[0].description, "");
        assert!(!prompts.prompts[0].arguments[0].required);

        let bare: ListPromptsResult =
            serde_json::from_str(r#"{ "prompts": [{ "name": "p", "arguments": null }] }"#).unwrap();
        assert!(bare.prompts[0].arguments.is_empty());
    }

    #[test]
    fn call_tool_result_with_mixed_content() {
        let raw = r#"{
            "content": [
                { "type": "text", "text": "hello" },
                { "type": "image", "data": "aGVsbG8=", "mimeType": "image/png" }
            ],
            "isError": true
        }"#;
        let result: CallToolResult = serde_json::from_str(raw).unwrap();
        assert!(result.is_error);
        assert_eq!(result.content[0].text.as_deref(), Some("hello"));
        assert_eq!(result.content[1].mime_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn read_resource_result_text_and_blob() {
        let raw = r#"{ "contents": [
            { "uri": "file:///a.txt", "mimeType": "text/plain", "text": "abc" },
            { "uri": "file:///b.bin", "blob": "AAEC" }
        ] }"#;
        let result: ReadResourceResult = serde_json::from_str(raw).unwrap();
        assert_eq!(result.contents[0].text.as_deref(), Some("abc"));
        assert_eq!(result.contents[1].blob.as_deref(), Some("AAEC"));
    }

    #[test]
    fn get_prompt_result_messages() {
        let raw = r#"{
            "description": "Review code",
            "messages": [{ "role": "user", "content": { "type": "text", "text": "Review this" } }]
        }"#;
        let result: GetPromptResult = serde_json::from_str(raw).unwrap();
        assert_eq!(result.messages[0].role, "user");
        assert_eq!(result.messages[0].content.text.as_deref(), Some("Review this"));
    }
}
