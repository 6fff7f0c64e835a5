//! MCP Protocol Types
//!
//! JSON-RPC 2.0 and MCP message types for the subset of the protocol this
//! server speaks: `initialize`, `tools/list` and `tools/call`. Resources and
//! prompts are deliberately absent from the capability surface.

use serde::{Deserialize, Serialize};

/// Protocol version advertised on initialize and echoed on every response
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC 2.0 Request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Option<JsonRpcId>,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// JSON-RPC 2.0 Response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Option<JsonRpcId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Build a success response around an already-serialized result
    pub fn success(id: Option<JsonRpcId>, result: serde_json::Value) -> Self {
        Self { jsonrpc: "2.0".to_string(), id, result: Some(result), error: None }
    }

    /// Build an error response
    pub fn error(id: Option<JsonRpcId>, error: JsonRpcError) -> Self {
        Self { jsonrpc: "2.0".to_string(), id, result: None, error: Some(error) }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum JsonRpcId {
    Number(i64),
    String(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// JSON-RPC error codes, including the server-defined range used for
/// authentication and throttling failures
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;

    /// No credential resolved for a method that requires one
    pub const AUTHENTICATION_REQUIRED: i32 = -32001;
    /// Caller exceeded the rolling-window request budget
    pub const RATE_LIMITED: i32 = -32002;
}

/// The closed set of MCP methods this server dispatches on.
///
/// Unknown method strings map to `None` in exactly one place, so an
/// unhandled case is a compile-time gap rather than a stray string match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum McpMethod {
    Initialize,
    Initialized,
    Ping,
    ToolsList,
    ToolsCall,
}

impl McpMethod {
    /// Parse a JSON-RPC method string into the closed method set
    pub fn parse(method: &str) -> Option<Self> {
        match method {
            "initialize" => Some(Self::Initialize),
            "initialized" | "notifications/initialized" => Some(Self::Initialized),
            "ping" => Some(Self::Ping),
            "tools/list" => Some(Self::ToolsList),
            "tools/call" => Some(Self::ToolsCall),
            _ => None,
        }
    }
}

/// MCP Initialize Request parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub protocol_version: String,
    #[serde(default)]
    pub capabilities: serde_json::Value,
    pub client_info: ClientInfo,
}

/// Client information provided during initialization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

/// MCP Initialize Response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    pub server_info: ServerInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// Server information provided during initialization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// Server capabilities.
///
/// Only tools are supported; resources and prompts are intentionally not
/// present so compliant clients never probe for them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerCapabilities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsCapability>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsCapability {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_changed: Option<bool>,
}

/// MCP Tool Definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<ToolAnnotations>,
}

/// Tool behavioral hints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolAnnotations {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only_hint: Option<bool>,
}

impl Tool {
    /// Create a tool definition with no annotations
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: serde_json::Value,
    ) -> Self {
        Self { name: name.into(), description: description.into(), input_schema, annotations: None }
    }

    /// Mark the tool as side-effect free
    pub fn read_only(mut self) -> Self {
        self.annotations = Some(ToolAnnotations { read_only_hint: Some(true) });
        self
    }
}

/// MCP Tools List parameters (cursor-paginated)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsListParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

/// MCP Tools List response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsListResult {
    pub tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// MCP Tool Call parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallParams {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<serde_json::Value>,
}

/// MCP Tool Call result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    pub content: Vec<ContentBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_rpc_request_roundtrip() {
        let request = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: Some(JsonRpcId::String("test-1".to_string())),
            method: "initialize".to_string(),
            params: serde_json::json!({"test": "value"}),
        };

        let json = serde_json::to_string(&request).expect("Failed to serialize");
        let deserialized: JsonRpcRequest =
            serde_json::from_str(&json).expect("Failed to deserialize");

        assert_eq!(deserialized.jsonrpc, "2.0");
        assert_eq!(deserialized.method, "initialize");
        assert_eq!(deserialized.id, Some(JsonRpcId::String("test-1".to_string())));
    }

    #[test]
    fn test_request_params_default_when_absent() {
        let request: JsonRpcRequest =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#).unwrap();
        assert!(request.params.is_null());
        assert_eq!(request.id, Some(JsonRpcId::Number(1)));
    }

    #[test]
    fn test_mcp_method_parse_known() {
        assert_eq!(McpMethod::parse("initialize"), Some(McpMethod::Initialize));
        assert_eq!(McpMethod::parse("notifications/initialized"), Some(McpMethod::Initialized));
        assert_eq!(McpMethod::parse("ping"), Some(McpMethod::Ping));
        assert_eq!(McpMethod::parse("tools/list"), Some(McpMethod::ToolsList));
        assert_eq!(McpMethod::parse("tools/call"), Some(McpMethod::ToolsCall));
    }

    #[test]
    fn test_mcp_method_parse_unknown() {
        assert_eq!(McpMethod::parse("resources/list"), None);
        assert_eq!(McpMethod::parse("prompts/get"), None);
        assert_eq!(McpMethod::parse(""), None);
    }

    #[test]
    fn test_initialize_params_deserialization() {
        let json = r#"{
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": {"name": "test-client", "version": "1.0.0"}
        }"#;

        let params: InitializeParams = serde_json::from_str(json).expect("Failed to deserialize");
        assert_eq!(params.protocol_version, "2024-11-05");
        assert_eq!(params.client_info.name, "test-client");
    }

    #[test]
    fn test_tools_list_result_camel_case() {
        let result = ToolsListResult {
            tools: vec![],
            next_cursor: Some("abc".to_string()),
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["nextCursor"], "abc");
        assert!(value.get("next_cursor").is_none());
    }

    #[test]
    fn test_tool_read_only_annotation() {
        let tool = Tool::new("t", "desc", serde_json::json!({"type": "object"})).read_only();
        let value = serde_json::to_value(&tool).unwrap();
        assert_eq!(value["annotations"]["readOnlyHint"], true);

        let plain = Tool::new("t", "desc", serde_json::json!({"type": "object"}));
        let value = serde_json::to_value(&plain).unwrap();
        assert!(value.get("annotations").is_none());
    }

    #[test]
    fn test_content_block_tagging() {
        let block = ContentBlock::Text { text: "hello".to_string() };
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value["type"], "text");
        assert_eq!(value["text"], "hello");
    }
}
