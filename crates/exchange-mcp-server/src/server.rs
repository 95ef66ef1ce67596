//! Stateless MCP server over streamable HTTP

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::protocol::{
    JsonRpcRequest, JsonRpcResponse, INVALID_PARAMS, INVALID_REQUEST, MCP_PROTOCOL_VERSION,
    METHOD_NOT_FOUND, PARSE_ERROR,
};
use crate::rates::{ExchangeRateArgs, RateClient};

pub const TOOL_NAME: &str = "get_exchange_rate";

const TOOL_DESCRIPTION: &str = "Use this to get current exchange rate. \
Returns a dictionary containing the exchange rate data, or an error message if the request fails.";

/// Server state: tool implementations
#[derive(Clone)]
pub struct ExchangeServer {
    rates: Arc<RateClient>,
}

impl ExchangeServer {
    pub fn new(rates: RateClient) -> Self {
        Self {
            rates: Arc::new(rates),
        }
    }

    /// `tools/list` result
    pub fn list_tools(&self) -> Value {
        let schema = schemars::schema_for!(ExchangeRateArgs);
        json!({
            "tools": [
                {
                    "name": TOOL_NAME,
                    "description": TOOL_DESCRIPTION,
                    "inputSchema": schema
                }
            ]
        })
    }

    /// `tools/call` result. Tool failures are reported in-band
    /// (`isError`), never as JSON-RPC errors.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Value {
        if name != TOOL_NAME {
            return tool_error(format!("Unknown tool: {}", name));
        }

        let arguments = if arguments.is_null() { json!({}) } else { arguments };
        let args: ExchangeRateArgs = match serde_json::from_value(arguments) {
            Ok(a) => a,
            Err(e) => return tool_error(format!("Invalid arguments for {}: {}", TOOL_NAME, e)),
        };

        let payload = self.rates.get_exchange_rate(&args).await;
        json!({
            "content": [{ "type": "text", "text": payload.to_string() }],
            "structuredContent": payload,
            "isError": false
        })
    }

    /// Dispatch one JSON-RPC message. Notifications produce no response.
    pub async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!(method = %request.method, "MCP request");

        if request.is_notification() {
            return None;
        }
        let id = request.id.clone().unwrap_or(Value::Null);

        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::failure(
                id,
                INVALID_REQUEST,
                "Unsupported jsonrpc version",
            ));
        }

        let params = request.params.unwrap_or_else(|| json!({}));

        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(
                id,
                json!({
                    "protocolVersion": MCP_PROTOCOL_VERSION,
                    "capabilities": { "tools": { "listChanged": false } },
                    "serverInfo": {
                        "name": "exchange-mcp",
                        "version": env!("CARGO_PKG_VERSION")
                    }
                }),
            ),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, self.list_tools()),
            "tools/call" => match params.get("name").and_then(|v| v.as_str()) {
                Some(name) => {
                    let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);
                    JsonRpcResponse::success(id, self.call_tool(name, arguments).await)
                }
                None => JsonRpcResponse::failure(id, INVALID_PARAMS, "Missing tool name"),
            },
            other => {
                let message = format!("Method not found: {}", other);
                JsonRpcResponse::failure(id, METHOD_NOT_FOUND, message)
            }
        };

        Some(response)
    }
}

fn tool_error(message: String) -> Value {
    json!({
        "content": [{ "type": "text", "text": message }],
        "isError": true
    })
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "exchange-mcp",
        "tools": [TOOL_NAME]
    }))
}

async fn mcp_endpoint(State(server): State<ExchangeServer>, body: Bytes) -> Response {
    let request: JsonRpcRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "Unparseable MCP message");
            let message = format!("Parse error: {}", e);
            let resp = JsonRpcResponse::failure(Value::Null, PARSE_ERROR, message);
            return (StatusCode::BAD_REQUEST, Json(resp)).into_response();
        }
    };

    match server.handle(request).await {
        Some(resp) => Json(resp).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// Build the HTTP router
pub fn router(server: ExchangeServer) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/mcp", post(mcp_endpoint))
        .layer(TraceLayer::new_for_http())
        .with_state(server)
}

/// Bind and serve until the process exits
pub async fn serve(server: ExchangeServer, addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "Exchange MCP server listening");

    axum::serve(listener, router(server)).await?;
    Ok(())
}
