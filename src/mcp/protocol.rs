use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::tools::{self, ToolError, Tools};

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "searxng";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;

/// Requests, notifications and client responses share this shape; `method`
/// is absent on responses and `id` is absent on notifications.
#[derive(Debug, Deserialize)]
pub struct JsonRpcMessage {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn into_response(self, id: Value) -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": self.code, "message": self.message },
        })
    }
}

impl From<ToolError> for RpcError {
    fn from(e: ToolError) -> Self {
        RpcError::new(INVALID_PARAMS, e.to_string())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct McpTool {
    name: &'static str,
    description: &'static str,
    input_schema: Value,
}

#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CallToolResult {
    content: Vec<TextContent>,
    is_error: bool,
}

#[derive(Debug, Serialize)]
struct TextContent {
    #[serde(rename = "type")]
    kind: &'static str,
    text: String,
}

/// Answers MCP JSON-RPC messages with the tool surface. Transport agnostic.
#[derive(Debug, Clone)]
pub struct McpHandler {
    tools: Arc<Tools>,
}

impl McpHandler {
    pub fn new(tools: Arc<Tools>) -> Self {
        Self { tools }
    }

    /// Returns the response to send back, or `None` for notifications and
    /// client responses.
    pub async fn handle(&self, message: Value) -> Option<Value> {
        let message: JsonRpcMessage = match serde_json::from_value(message) {
            Ok(message) => message,
            Err(e) => {
                return Some(RpcError::new(INVALID_REQUEST, e.to_string()).into_response(Value::Null));
            }
        };

        let method = message.method?;
        let Some(id) = message.id else {
            tracing::debug!("notification: {method}");
            return None;
        };

        let result = match method.as_str() {
            "initialize" => Ok(initialize_result()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": list_tools() })),
            "tools/call" => self.call_tool(message.params).await,
            other => Err(RpcError::new(
                METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
            )),
        };

        Some(match result {
            Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
            Err(e) => e.into_response(id),
        })
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, RpcError> {
        let params: CallToolParams = params
            .ok_or_else(|| RpcError::new(INVALID_PARAMS, "missing tools/call params"))
            .and_then(|p| {
                serde_json::from_value(p).map_err(|e| RpcError::new(INVALID_PARAMS, e.to_string()))
            })?;
        let args = params.arguments.unwrap_or_else(|| json!({}));

        tracing::info!("tools/call {}", params.name);
        let out = self.tools.call(&params.name, args).await?;

        // plain strings go out verbatim, structured output as JSON text
        let text = match out {
            Value::String(s) => s,
            other => serde_json::to_string_pretty(&other).unwrap_or_else(|_| other.to_string()),
        };
        let result = CallToolResult {
            content: vec![TextContent { kind: "text", text }],
            is_error: false,
        };
        Ok(json!(result))
    }
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": { "tools": { "listChanged": false } },
        "serverInfo": { "name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION") },
    })
}

fn list_tools() -> Vec<McpTool> {
    tools::descriptors()
        .into_iter()
        .map(|d| McpTool {
            name: d.name,
            description: d.description,
            input_schema: d.input_schema,
        })
        .collect()
}
