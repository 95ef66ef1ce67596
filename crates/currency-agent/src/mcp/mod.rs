//! MCP (Model Context Protocol) client support
//!
//! The agent loads its tools from one MCP server over streamable HTTP:
//!
//! ```text
//! CurrencyAgent ──► McpClient ──► HttpTransport ──POST /mcp──► exchange-mcp
//!                      │
//!                      └─► McpTool (one per listed tool) ──► ToolRegistry
//! ```

pub mod client;
pub mod tools;
pub mod transport;

// Re-exports
pub use client::{CallToolResult, McpClient, McpToolInfo};
pub use tools::McpTool;
pub use transport::{HttpTransport, McpTransport};

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::tools::registry::ToolRegistry;
use crate::tools::Tool;

/// Extension trait for ToolRegistry to add MCP tools
pub trait McpRegistryExt {
    /// Register all tools discovered on an MCP server
    fn register_mcp_tools(&mut self, tools: Vec<McpTool>);
}

impl McpRegistryExt for ToolRegistry {
    fn register_mcp_tools(&mut self, tools: Vec<McpTool>) {
        for tool in tools {
            debug!("Registering MCP tool: {}", tool.name());
            self.register(tool);
        }
    }
}

/// List the server's tools and wrap each one
pub async fn discover_tools(client: &Arc<McpClient>) -> Result<Vec<McpTool>> {
    let infos = client.list_tools().await?;
    info!(
        tools = ?infos.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
        "Discovered MCP tools"
    );

    Ok(infos
        .into_iter()
        .map(|info| McpTool::new(info, Arc::clone(client)))
        .collect())
}

/// Connect to `url` and build a registry from its tools
pub async fn create_registry(url: &str) -> Result<(Arc<McpClient>, ToolRegistry)> {
    let client = Arc::new(McpClient::connect(url).await?);
    let mut registry = ToolRegistry::new();
    registry.register_mcp_tools(discover_tools(&client).await?);
    Ok((client, registry))
}
