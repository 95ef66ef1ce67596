//! Tool framework for the reasoning engine
//!
//! Tools are discovered from an MCP server at startup and exposed to the
//! model as function definitions.

pub mod registry;

use anyhow::Result;
use async_trait::async_trait;
use llm_core::ToolDefinition;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use registry::ToolRegistry;

/// Result of tool execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the tool executed successfully
    pub success: bool,
    /// Output from the tool
    pub output: String,
    /// Error message if failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    /// Create a successful result
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: None,
        }
    }

    /// Create a failed result
    pub fn error(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(error.into()),
        }
    }

    /// Text handed back to the model as the tool message.
    ///
    /// Failures are reported in-band so the model can react on its next turn.
    pub fn to_message_content(&self) -> String {
        match (&self.error, self.success) {
            (Some(err), false) if self.output.is_empty() => {
                serde_json::json!({ "error": err }).to_string()
            }
            (Some(err), false) => format!("{}\n{}", self.output, err),
            _ => self.output.clone(),
        }
    }
}

/// The Tool trait that all tools must implement
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool name
    fn name(&self) -> &str;

    /// Get a description of what the tool does
    fn description(&self) -> &str;

    /// JSON Schema of the tool arguments
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with the given arguments
    async fn execute(&self, args: &Value) -> Result<ToolResult>;

    /// Convert to a tool definition for the LLM
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition::function(self.name(), self.description(), self.parameters_schema())
    }
}
