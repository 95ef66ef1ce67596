//! End-to-end tests against a mock rate API

use std::collections::HashMap;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Path, Query},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use exchange_mcp::{router, ExchangeServer, RateClient};

async fn mock_rates(
    Path(date): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let from = query.get("from").cloned().unwrap_or_default();
    let to = query.get("to").cloned().unwrap_or_default();

    match date.as_str() {
        "latest" => Json(json!({
            "amount": 1.0,
            "base": from,
            "date": "2026-10-16",
            "rates": { to: 0.935 }
        }))
        .into_response(),
        "2000-01-01" => Json(json!({ "message": "no rates here" })).into_response(),
        "1999-12-31" => "definitely not json".into_response(),
        _ => (StatusCode::NOT_FOUND, Json(json!({ "message": "not found" }))).into_response(),
    }
}

async fn spawn_mock_api() -> String {
    let app = Router::new().route("/:date", get(mock_rates));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn exchange_app() -> Router {
    let base = spawn_mock_api().await;
    let rates = RateClient::new(base, Duration::from_secs(5)).unwrap();
    router(ExchangeServer::new(rates))
}

async fn post_mcp(app: Router, body: Value) -> (StatusCode, Option<Value>) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/mcp")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        None
    } else {
        Some(serde_json::from_slice(&bytes).unwrap())
    };
    (status, value)
}

async fn call_rate(arguments: Value) -> Value {
    let (status, body) = post_mcp(
        exchange_app().await,
        json!({
            "jsonrpc": "2.0",
            "id": 3,
            "method": "tools/call",
            "params": { "name": "get_exchange_rate", "arguments": arguments }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let result = body.unwrap()["result"].clone();
    assert_eq!(result["isError"], json!(false));
    serde_json::from_str(result["content"][0]["text"].as_str().unwrap()).unwrap()
}

#[tokio::test]
async fn test_initialize_handshake() {
    let (status, body) = post_mcp(
        exchange_app().await,
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "protocolVersion": "2025-03-26",
                "capabilities": {},
                "clientInfo": { "name": "t", "version": "0" }
            }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["id"], json!(1));
    assert!(body["result"]["capabilities"].get("tools").is_some());

    let (status, body) = post_mcp(
        exchange_app().await,
        json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(body.is_none());
}

#[tokio::test]
async fn test_latest_rate_is_passed_through() {
    let payload = call_rate(json!({ "currency_from": "USD", "currency_to": "CAD" })).await;
    assert_eq!(payload["base"], json!("USD"));
    assert_eq!(payload["rates"]["CAD"], json!(0.935));
}

#[tokio::test]
async fn test_defaults_apply_when_arguments_missing() {
    let payload = call_rate(json!({})).await;
    assert_eq!(payload["base"], json!("USD"));
    assert!(payload["rates"].get("EUR").is_some());
}

#[tokio::test]
async fn test_http_error_becomes_error_payload() {
    let payload = call_rate(json!({ "currency_date": "2099-01-01" })).await;
    assert!(payload["error"]
        .as_str()
        .unwrap()
        .starts_with("API request failed:"));
}

#[tokio::test]
async fn test_missing_rates_is_invalid_format() {
    let payload = call_rate(json!({ "currency_date": "2000-01-01" })).await;
    assert_eq!(payload["error"], json!("Invalid API response format."));
}

#[tokio::test]
async fn test_non_json_body_is_reported() {
    let payload = call_rate(json!({ "currency_date": "1999-12-31" })).await;
    assert_eq!(payload["error"], json!("Invalid JSON response from API."));
}

#[tokio::test]
async fn test_malformed_date_is_error_payload() {
    let payload = call_rate(json!({ "currency_date": "garbage" })).await;
    assert!(payload["error"]
        .as_str()
        .unwrap()
        .starts_with("Invalid date \"garbage\""));
}

#[tokio::test]
async fn test_malformed_body_is_parse_error() {
    let response = exchange_app()
        .await
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/mcp")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"]["code"], json!(-32700));
}
