//! Tool registry for managing available tools

use std::collections::HashMap;
use std::sync::Arc;

use llm_core::ToolDefinition;
use serde_json::Value;
use tracing::{debug, warn};

use super::{Tool, ToolResult};

/// Registry of available tools
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// List all registered tool names, sorted
    pub fn list_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Get tool definitions for the LLM API, in name order
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.list_names()
            .into_iter()
            .filter_map(|name| self.tools.get(name))
            .map(|t| t.to_definition())
            .collect()
    }

    /// Run a tool by name. Unknown tools and execution faults come back as
    /// failed results rather than errors.
    pub async fn execute(&self, name: &str, args: &Value) -> ToolResult {
        let Some(tool) = self.get(name) else {
            warn!(tool = name, "Model requested an unknown tool");
            return ToolResult::error(format!("Unknown tool: {}", name));
        };

        debug!(tool = name, "Executing tool");
        match tool.execute(args).await {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = name, error = %e, "Tool execution failed");
                ToolResult::error(format!("{:#}", e))
            }
        }
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.list_names())
            .finish()
    }
}
