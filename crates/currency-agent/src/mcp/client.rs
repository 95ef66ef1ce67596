//! MCP client implementation
//!
//! Implements the Model Context Protocol client for communication with MCP servers.

use super::transport::{HttpTransport, JsonRpcRequest, JsonRpcResponse, McpTransport};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// MCP protocol version
pub const MCP_PROTOCOL_VERSION: &str = "2025-03-26";

/// Client capabilities
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClientCapabilities {}

/// Client info for initialization
#[derive(Debug, Clone, Serialize)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self {
            name: "currency-agent".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Server capabilities returned during initialization
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerCapabilities {
    #[serde(default)]
    pub tools: Option<ToolsCapability>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsCapability {
    #[serde(default)]
    pub list_changed: bool,
}

/// Server info returned during initialization
#[derive(Debug, Clone, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
}

/// Initialize result
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    pub server_info: ServerInfo,
}

/// MCP Tool definition from server
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct McpToolInfo {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub input_schema: Value,
}

/// Tool list result
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListToolsResult {
    pub tools: Vec<McpToolInfo>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// Tool call result content
#[derive(Debug, Clone, Deserialize)]
pub struct ToolResultContent {
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default)]
    pub text: Option<String>,
}

/// Tool call result
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    pub content: Vec<ToolResultContent>,
    #[serde(default)]
    pub structured_content: Option<Value>,
    #[serde(default)]
    pub is_error: bool,
}

impl CallToolResult {
    /// All text content items joined by newlines
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter(|c| c.content_type == "text")
            .filter_map(|c| c.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// MCP Client
pub struct McpClient {
    transport: Arc<Mutex<Box<dyn McpTransport>>>,
    request_id: AtomicU64,
    server_info: Option<ServerInfo>,
    server_capabilities: Option<ServerCapabilities>,
    initialized: bool,
}

impl McpClient {
    /// Create a new MCP client with the given transport
    pub fn new(transport: Box<dyn McpTransport>) -> Self {
        Self {
            transport: Arc::new(Mutex::new(transport)),
            request_id: AtomicU64::new(1),
            server_info: None,
            server_capabilities: None,
            initialized: false,
        }
    }

    /// Connect to a streamable HTTP server and run the handshake
    pub async fn connect(url: &str) -> Result<Self> {
        let mut client = Self::new(Box::new(HttpTransport::new(url)?));
        let init = client
            .initialize()
            .await
            .with_context(|| format!("MCP handshake with {} failed", url))?;
        info!(
            server = %init.server_info.name,
            protocol = %init.protocol_version,
            "Connected to MCP server"
        );
        Ok(client)
    }

    /// Get the next request ID
    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Send a request and get the result
    async fn request<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<T> {
        let request = JsonRpcRequest::new(self.next_id(), method, params);
        debug!(method, id = request.id, "MCP request");

        let transport = self.transport.lock().await;
        let response: JsonRpcResponse = transport.send_request(request).await?;

        if let Some(error) = response.error {
            bail!("MCP error: {}", error);
        }

        let result = response.result.context("MCP response missing result")?;
        let typed_result: T =
            serde_json::from_value(result).context("Failed to parse MCP result")?;

        Ok(typed_result)
    }

    /// Initialize the connection with the MCP server
    pub async fn initialize(&mut self) -> Result<InitializeResult> {
        let params = serde_json::json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": ClientCapabilities::default(),
            "clientInfo": ClientInfo::default()
        });

        let result: InitializeResult = self
            .request("initialize", Some(params))
            .await
            .context("Failed to initialize MCP connection")?;

        // Send initialized notification
        {
            let transport = self.transport.lock().await;
            transport
                .send_notification("notifications/initialized", None)
                .await?;
        }

        self.server_info = Some(result.server_info.clone());
        self.server_capabilities = Some(result.capabilities.clone());
        self.initialized = true;

        Ok(result)
    }

    /// Check if the client is initialized
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Get server info
    pub fn server_info(&self) -> Option<&ServerInfo> {
        self.server_info.as_ref()
    }

    /// List available tools
    pub async fn list_tools(&self) -> Result<Vec<McpToolInfo>> {
        if !self.initialized {
            bail!("MCP client not initialized");
        }

        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let params = cursor.as_ref().map(|c| serde_json::json!({ "cursor": c }));

            let result: ListToolsResult = self
                .request("tools/list", params)
                .await
                .context("Failed to list MCP tools")?;

            tools.extend(result.tools);

            if result.next_cursor.is_none() {
                break;
            }
            cursor = result.next_cursor;
        }

        Ok(tools)
    }

    /// Call a tool
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult> {
        if !self.initialized {
            bail!("MCP client not initialized");
        }

        let params = serde_json::json!({
            "name": name,
            "arguments": arguments
        });

        let result: CallToolResult = self
            .request("tools/call", Some(params))
            .await
            .with_context(|| format!("Failed to call MCP tool: {}", name))?;

        Ok(result)
    }

    /// Ping the server
    pub async fn ping(&self) -> Result<()> {
        if !self.initialized {
            bail!("MCP client not initialized");
        }

        let _: Value = self.request("ping", None).await?;
        Ok(())
    }

    /// Close the connection
    pub async fn close(&self) -> Result<()> {
        let mut transport = self.transport.lock().await;
        transport.close().await
    }
}
