//! MCP transport layer
//!
//! Streamable HTTP: every message is a POST; the server answers with either
//! a JSON body or a short SSE stream carrying the response.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Header carrying the server-assigned session
pub const SESSION_HEADER: &str = "mcp-session-id";

/// JSON-RPC 2.0 request
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC 2.0 response
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Option<u64>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JSON-RPC error {}: {}", self.code, self.message)
    }
}

/// Transport trait for MCP communication
#[async_trait]
pub trait McpTransport: Send + Sync {
    /// Send a request and wait for response
    async fn send_request(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse>;

    /// Send a notification (no response expected)
    async fn send_notification(&self, method: &str, params: Option<Value>) -> Result<()>;

    /// Check if transport is still connected
    fn is_connected(&self) -> bool;

    /// Close the transport
    async fn close(&mut self) -> Result<()>;
}

/// Pick the response to `request_id` out of an SSE body.
///
/// Events are separated by blank lines; multi-line `data:` fields are
/// joined with newlines. Server notifications and unrelated responses are
/// skipped.
pub fn parse_sse_response(body: &str, request_id: u64) -> Result<JsonRpcResponse> {
    let mut data = String::new();
    let mut events = Vec::new();

    for line in body.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            if !data.is_empty() {
                events.push(std::mem::take(&mut data));
            }
            continue;
        }
        if let Some(rest) = line.strip_prefix("data:") {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
    if !data.is_empty() {
        events.push(data);
    }

    for event in events {
        let Ok(value) = serde_json::from_str::<Value>(&event) else {
            debug!(event = %event, "Skipping non-JSON SSE event");
            continue;
        };
        if value.get("id").and_then(Value::as_u64) != Some(request_id) {
            continue;
        }
        return serde_json::from_value(value).context("Failed to parse JSON-RPC response");
    }

    bail!("SSE stream ended without a response to request {}", request_id)
}

/// Streamable HTTP transport for remote MCP servers
pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
    session_id: Mutex<Option<String>>,
    connected: AtomicBool,
}

impl HttpTransport {
    /// Create a new HTTP transport
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.into(),
            client,
            session_id: Mutex::new(None),
            connected: AtomicBool::new(true),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Session assigned by the server, if any
    pub fn session_id(&self) -> Option<String> {
        self.session_id.lock().clone()
    }

    async fn post(&self, body: &Value) -> Result<reqwest::Response> {
        if !self.is_connected() {
            bail!("MCP transport is closed");
        }

        let mut request = self
            .client
            .post(&self.base_url)
            .header(ACCEPT, "application/json, text/event-stream")
            .json(body);
        if let Some(session) = self.session_id() {
            request = request.header(SESSION_HEADER, session);
        }

        let response = request
            .send()
            .await
            .context("Failed to send HTTP request to MCP server")?;

        if !response.status().is_success() {
            bail!("MCP server returned error status: {}", response.status());
        }

        if let Some(session) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            *self.session_id.lock() = Some(session.to_string());
        }

        Ok(response)
    }
}

#[async_trait]
impl McpTransport for HttpTransport {
    async fn send_request(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse> {
        let request_id = request.id;
        let response = self.post(&serde_json::to_value(&request)?).await?;

        let is_sse = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/event-stream"));

        if is_sse {
            let body = response
                .text()
                .await
                .context("Failed to read SSE body from MCP server")?;
            parse_sse_response(&body, request_id)
        } else {
            response
                .json()
                .await
                .context("Failed to parse JSON-RPC response from MCP server")
        }
    }

    async fn send_notification(&self, method: &str, params: Option<Value>) -> Result<()> {
        let mut notification = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
        });
        if let Some(params) = params {
            notification["params"] = params;
        }

        self.post(&notification)
            .await
            .context("Failed to send notification to MCP server")?;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn close(&mut self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        *self.session_id.lock() = None;
        Ok(())
    }
}
