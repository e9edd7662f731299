//! JSON-RPC 2.0 framing and the slice of MCP messages Gridline speaks.

use gridline_core::error::ToolError;
use gridline_core::tool::Tool;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// An outgoing request, or a notification when `id` is `None`.
#[derive(Debug, Serialize)]
pub struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl<'a> RpcRequest<'a> {
    pub fn request(id: u64, method: &'a str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id: Some(id),
            method,
            params,
        }
    }

    pub fn notification(method: &'a str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id: None,
            method,
            params,
        }
    }
}

/// Any message read from the server: a response, a notification, or a
/// server-initiated request.
#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

/// The outcome half of a response, routed to the waiting caller.
pub type RpcOutcome = Result<Value, RpcError>;

impl IncomingMessage {
    /// The numeric id if this is a response to one of our requests.
    pub fn response_id(&self) -> Option<u64> {
        if self.method.is_some() {
            return None;
        }
        self.id.as_ref().and_then(Value::as_u64)
    }

    pub fn into_outcome(self) -> RpcOutcome {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    #[serde(default)]
    pub protocol_version: String,
    #[serde(default)]
    pub server_info: Option<ServerInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListToolsResult {
    #[serde(default)]
    pub tools: Vec<McpTool>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpTool {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub input_schema: Value,
}

impl From<McpTool> for Tool {
    fn from(tool: McpTool) -> Self {
        Tool {
            name: tool.name,
            description: tool.description.unwrap_or_default(),
            input_schema: tool.input_schema,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    #[serde(default)]
    pub content: Vec<McpContent>,
    #[serde(default)]
    pub is_error: bool,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum McpContent {
    Text { text: String },
    #[serde(other)]
    Other,
}

impl CallToolResult {
    /// Text fragments in order; non-text content is skipped. A result
    /// flagged `isError` becomes `ExecutionFailed` carrying the text.
    pub fn into_fragments(self, tool_name: &str) -> Result<Vec<String>, ToolError> {
        let fragments: Vec<String> = self
            .content
            .into_iter()
            .filter_map(|item| match item {
                McpContent::Text { text } => Some(text),
                McpContent::Other => None,
            })
            .collect();

        if self.is_error {
            return Err(ToolError::ExecutionFailed {
                tool_name: tool_name.to_string(),
                reason: fragments.join(" ").trim().to_string(),
            });
        }

        Ok(fragments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_has_no_id() {
        let json = serde_json::to_value(RpcRequest::notification("notifications/initialized", None))
            .unwrap();
        assert_eq!(json["jsonrpc"], "2.0");
        assert!(json.get("id").is_none());
        assert!(json.get("params").is_none());
    }

    #[test]
    fn response_id_ignores_server_requests() {
        let response: IncomingMessage =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":7,"result":{}}"#).unwrap();
        assert_eq!(response.response_id(), Some(7));

        let request: IncomingMessage =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":7,"method":"ping"}"#).unwrap();
        assert_eq!(request.response_id(), None);
    }

    #[test]
    fn error_response_becomes_err_outcome() {
        let msg: IncomingMessage = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"Method not found"}}"#,
        )
        .unwrap();
        let err = msg.into_outcome().unwrap_err();
        assert_eq!(err.code, -32601);
    }

    #[test]
    fn list_tools_result_converts_to_tools() {
        let result: ListToolsResult = serde_json::from_value(serde_json::json!({
            "tools": [{
                "name": "check_outage",
                "description": "Check electricity outage status for a given area or locality",
                "inputSchema": {
                    "type": "object",
                    "required": ["area"],
                    "properties": { "area": { "type": "string" } }
                }
            }],
            "nextCursor": "page-2"
        }))
        .unwrap();

        assert_eq!(result.next_cursor.as_deref(), Some("page-2"));
        let tools: Vec<Tool> = result.tools.into_iter().map(Tool::from).collect();
        assert_eq!(tools[0].name, "check_outage");
        assert_eq!(tools[0].input_schema["required"][0], "area");
    }

    #[test]
    fn call_result_keeps_only_text() {
        let result: CallToolResult = serde_json::from_value(serde_json::json!({
            "content": [
                {"type": "text", "text": "Meter: UP7284651023"},
                {"type": "image", "data": "...", "mimeType": "image/png"},
                {"type": "text", "text": "Status: Pending"}
            ]
        }))
        .unwrap();

        let fragments = result.into_fragments("check_billing_status").unwrap();
        assert_eq!(fragments, vec!["Meter: UP7284651023", "Status: Pending"]);
    }

    #[test]
    fn call_result_error_flag_fails() {
        let result: CallToolResult = serde_json::from_value(serde_json::json!({
            "content": [{"type": "text", "text": "database unavailable"}],
            "isError": true
        }))
        .unwrap();

        let err = result.into_fragments("check_outage").unwrap_err();
        match err {
            ToolError::ExecutionFailed { tool_name, reason } => {
                assert_eq!(tool_name, "check_outage");
                assert_eq!(reason, "database unavailable");
            }
            other => panic!("Expected ExecutionFailed, got {other:?}"),
        }
    }
}
