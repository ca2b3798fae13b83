//! MCP protocol payloads used by the client.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol revision sent in `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

#[derive(Debug, Clone, Serialize)]
pub(crate) struct JsonRpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct JsonRpcNotification<'a> {
    pub jsonrpc: &'static str,
    pub method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// Any line a server writes: a response, or a request/notification of its
/// own (those carry `method`).
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct JsonRpcIncoming {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

/// Tool definition from `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct McpToolDef {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "inputSchema")]
    pub input_schema: Value,
}

/// Result of `tools/call`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct McpToolResult {
    #[serde(default)]
    pub content: Vec<McpContent>,
    #[serde(default, rename = "isError")]
    pub is_error: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum McpContent {
    Text {
        text: String,
    },
    Image {
        #[serde(rename = "mimeType", default)]
        mime_type: String,
    },
    Resource {
        resource: Value,
    },
    #[serde(other)]
    Unknown,
}

impl McpToolResult {
    /// Flattens the content blocks into the text handed back to the model.
    pub fn to_text(&self) -> String {
        let body = self
            .content
            .iter()
            .map(|block| match block {
                McpContent::Text { text } => text.clone(),
                McpContent::Image { mime_type } => format!("[image: {}]", mime_type),
                McpContent::Resource { resource } => resource
                    .get("text")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .or_else(|| {
                        resource
                            .get("uri")
                            .and_then(Value::as_str)
                            .map(|uri| format!("[resource: {}]", uri))
                    })
                    .unwrap_or_default(),
                McpContent::Unknown => String::new(),
            })
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        if self.is_error {
            format!("Tool error: {}", body)
        } else {
            body
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flattens_mixed_content() {
        let result: McpToolResult = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "Navigated to https://example.com"},
                {"type": "image", "data": "AAAA", "mimeType": "image/png"},
                {"type": "resource", "resource": {"uri": "file:///tmp/page.md"}},
                {"type": "audio", "data": "..."}
            ]
        }))
        .unwrap();
        assert_eq!(
            result.to_text(),
            "Navigated to https://example.com\n[image: image/png]\n[resource: file:///tmp/page.md]"
        );
    }

    #[test]
    fn error_results_are_marked() {
        let result: McpToolResult = serde_json::from_value(json!({
            "content": [{"type": "text", "text": "element not found"}],
            "isError": true
        }))
        .unwrap();
        assert_eq!(result.to_text(), "Tool error: element not found");
    }
}
