//! HTTP surface of the A2A server: agent card and JSON-RPC endpoint

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use super::a2a::{AgentCard, MessageSendParams, TaskIdParams, TaskQueryParams};
use super::executor::{CurrencyAgentExecutor, ServerError};

pub const AGENT_CARD_PATH: &str = "/.well-known/agent.json";

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub executor: Arc<CurrencyAgentExecutor>,
    pub card: Arc<AgentCard>,
}

#[derive(Debug, Deserialize)]
struct RpcRequest {
    jsonrpc: String,
    #[serde(default)]
    id: Value,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Serialize)]
struct RpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<Value>,
}

impl RpcResponse {
    fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn failure(id: Value, err: &ServerError) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(json!({ "code": err.code(), "message": err.to_string() })),
        }
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(params: Value) -> Result<T, ServerError> {
    serde_json::from_value(params).map_err(|e| ServerError::InvalidParams(e.to_string()))
}

fn to_result<T: Serialize>(value: T) -> Result<Value, ServerError> {
    serde_json::to_value(value).map_err(|e| ServerError::Internal(e.to_string()))
}

async fn dispatch(state: &AppState, request: RpcRequest) -> Result<Value, ServerError> {
    if request.jsonrpc != "2.0" {
        return Err(ServerError::InvalidRequest("jsonrpc must be \"2.0\"".to_string()));
    }
    debug!(method = %request.method, "A2A request");

    match request.method.as_str() {
        "message/send" => {
            let params: MessageSendParams = parse_params(request.params)?;
            to_result(state.executor.execute(params).await?)
        }
        "tasks/get" => {
            let params: TaskQueryParams = parse_params(request.params)?;
            let mut task = state
                .executor
                .tasks()
                .get(&params.id)
                .ok_or_else(|| ServerError::TaskNotFound(params.id.clone()))?;
            if let Some(n) = params.history_length {
                let skip = task.history.len().saturating_sub(n);
                task.history.drain(..skip);
            }
            to_result(task)
        }
        "tasks/cancel" => {
            let params: TaskIdParams = parse_params(request.params)?;
            to_result(state.executor.cancel(params).await?)
        }
        other => Err(ServerError::MethodNotFound(other.to_string())),
    }
}

async fn rpc_endpoint(State(state): State<AppState>, body: Bytes) -> Json<RpcResponse> {
    let request: RpcRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "Unparseable A2A request");
            return Json(RpcResponse::failure(Value::Null, &ServerError::Parse(e.to_string())));
        }
    };

    let id = request.id.clone();
    match dispatch(&state, request).await {
        Ok(result) => Json(RpcResponse::success(id, result)),
        Err(err) => Json(RpcResponse::failure(id, &err)),
    }
}

async fn agent_card(State(state): State<AppState>) -> Json<AgentCard> {
    Json(state.card.as_ref().clone())
}

/// Build the HTTP router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(AGENT_CARD_PATH, get(agent_card))
        .route("/", post(rpc_endpoint))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::testing::ScriptedEngine;
    use crate::agent::{AgentConfig, CurrencyAgent};
    use crate::reconcile::{ConversationEvent, StructuredVerdict, VerdictStatus};
    use crate::server::tasks::InMemoryTaskStore;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    fn app() -> Router {
        let engine = ScriptedEngine::new(
            vec![ConversationEvent::assistant("", true), ConversationEvent::tool("{}")],
            Some(StructuredVerdict::new(VerdictStatus::Completed, "1 USD = 1.37 CAD")),
        );
        let agent =
            CurrencyAgent::new("http://unused", "http://unused/mcp", AgentConfig::default())
                .with_engine(Arc::new(engine));
        let executor =
            CurrencyAgentExecutor::new(Arc::new(agent), Arc::new(InMemoryTaskStore::new()));
        router(AppState {
            executor: Arc::new(executor),
            card: Arc::new(AgentCard::currency_agent(
                "http://localhost:9091/",
                CurrencyAgent::SUPPORTED_CONTENT_TYPES,
            )),
        })
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn rpc(app: Router, body: Value) -> Value {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await
    }

    fn send_body(text: &str) -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": "req-1",
            "method": "message/send",
            "params": {
                "message": {
                    "role": "user",
                    "parts": [{ "kind": "text", "text": text }],
                    "messageId": "9229e770767c417b"
                }
            }
        })
    }

    #[tokio::test]
    async fn test_agent_card() {
        let response = app()
            .oneshot(Request::builder().uri(AGENT_CARD_PATH).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let card = body_json(response).await;
        assert_eq!(card["name"], json!("Currency Agent"));
        assert_eq!(card["skills"][0]["id"], json!("convert_currency"));
    }

    #[tokio::test]
    async fn test_send_then_get() {
        let app = app();
        let sent = rpc(app.clone(), send_body("how much is 1 USD in CAD?")).await;
        assert_eq!(sent["id"], json!("req-1"));
        let task = &sent["result"];
        assert_eq!(task["kind"], json!("task"));
        assert_eq!(task["status"]["state"], json!("completed"));
        assert_eq!(task["artifacts"][0]["name"], json!("conversion_result"));
        assert_eq!(task["artifacts"][0]["parts"][0]["text"], json!("1 USD = 1.37 CAD"));

        let fetched = rpc(
            app,
            json!({
                "jsonrpc": "2.0",
                "id": 2,
                "method": "tasks/get",
                "params": { "id": task["id"], "historyLength": 1 }
            }),
        )
        .await;
        assert_eq!(fetched["result"]["id"], task["id"]);
        assert_eq!(fetched["result"]["history"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let parse = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .body(Body::from("{oops"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(body_json(parse).await["error"]["code"], json!(-32700));

        let unknown = rpc(
            app(),
            json!({ "jsonrpc": "2.0", "id": 1, "method": "tasks/resubscribe" }),
        )
        .await;
        assert_eq!(unknown["error"]["code"], json!(-32601));

        let missing = rpc(
            app(),
            json!({ "jsonrpc": "2.0", "id": 1, "method": "tasks/get", "params": { "id": "nope" } }),
        )
        .await;
        assert_eq!(missing["error"]["code"], json!(-32001));

        let bad = rpc(
            app(),
            json!({ "jsonrpc": "2.0", "id": 1, "method": "message/send", "params": {} }),
        )
        .await;
        assert_eq!(bad["error"]["code"], json!(-32602));
    }
}
