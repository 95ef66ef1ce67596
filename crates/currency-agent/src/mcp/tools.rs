//! MCP Tool adapter
//!
//! Wraps MCP tools as agent Tool trait implementations.

use super::client::{CallToolResult, McpClient, McpToolInfo};
use crate::tools::{Tool, ToolResult};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

/// Adapter that wraps an MCP tool as an agent Tool
pub struct McpTool {
    /// Original tool info from MCP server
    tool_info: McpToolInfo,
    /// Client for executing the tool
    client: Arc<McpClient>,
}

impl McpTool {
    /// Create a new MCP tool adapter
    pub fn new(tool_info: McpToolInfo, client: Arc<McpClient>) -> Self {
        Self { tool_info, client }
    }

    pub fn info(&self) -> &McpToolInfo {
        &self.tool_info
    }
}

#[async_trait]
impl Tool for McpTool {
    fn name(&self) -> &str {
        &self.tool_info.name
    }

    fn description(&self) -> &str {
        self.tool_info.description.as_deref().unwrap_or("MCP tool")
    }

    fn parameters_schema(&self) -> Value {
        normalize_schema(&self.tool_info.input_schema)
    }

    async fn execute(&self, args: &Value) -> Result<ToolResult> {
        let result = self.client.call_tool(&self.tool_info.name, args.clone()).await?;
        Ok(mcp_result_to_tool_result(result))
    }
}

/// Ollama wants an object schema; servers may omit the schema entirely.
fn normalize_schema(schema: &Value) -> Value {
    match schema {
        Value::Object(map) if !map.is_empty() => {
            let mut schema = schema.clone();
            if map.get("type").is_none() {
                schema["type"] = json!("object");
            }
            schema
        }
        _ => json!({ "type": "object", "properties": {} }),
    }
}

/// Convert MCP CallToolResult to ToolResult
fn mcp_result_to_tool_result(result: CallToolResult) -> ToolResult {
    let output = result.text();

    if result.is_error {
        ToolResult {
            success: false,
            error: Some(if output.is_empty() {
                "MCP tool reported an error".to_string()
            } else {
                output.clone()
            }),
            output: String::new(),
        }
    } else {
        ToolResult::success(output)
    }
}
