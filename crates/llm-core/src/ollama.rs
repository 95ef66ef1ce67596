//! Ollama API client

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Ollama service status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OllamaStatus {
    /// Service is running and ready
    Running,
    /// Service is not reachable
    Stopped,
}

/// Model information from Ollama API
#[derive(Debug, Clone, Deserialize)]
pub struct Model {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub digest: String,
    #[serde(default)]
    pub modified_at: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    models: Vec<Model>,
}

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// Function invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// A tool call attached to an assistant message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub function: FunctionCall,
}

/// A single chat message, as sent to and received from `/api/chat`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Name of the tool that produced this message (tool role only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl ChatMessage {
    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_name: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    /// Message carrying the output of a tool back to the model
    pub fn tool_result(tool_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_name: Some(tool_name.into()),
            ..Self::plain(Role::Tool, content)
        }
    }

    /// Whether the model asked for at least one tool invocation
    pub fn has_tool_calls(&self) -> bool {
        self.role == Role::Assistant && !self.tool_calls.is_empty()
    }
}

/// Function schema exposed to the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema of the arguments object
    pub parameters: Value,
}

/// Tool definition for the Ollama API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

impl ToolDefinition {
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
    ) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

/// Output constraint for a chat request
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseFormat {
    /// Any valid JSON
    Json,
    /// JSON matching the given schema
    Schema(Value),
}

impl Serialize for ResponseFormat {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            ResponseFormat::Json => serializer.serialize_str("json"),
            ResponseFormat::Schema(schema) => schema.serialize(serializer),
        }
    }
}

/// Sampling options
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_ctx: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
}

impl ChatOptions {
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolDefinition]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a ResponseFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<&'a ChatOptions>,
}

/// Non-streaming `/api/chat` response
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub model: String,
    pub message: ChatMessage,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub done_reason: Option<String>,
    #[serde(default)]
    pub prompt_eval_count: Option<u64>,
    #[serde(default)]
    pub eval_count: Option<u64>,
}

/// Retry policy for transient failures (connection errors, 5xx)
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryConfig {
    /// No retries at all
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Exponential backoff for the given (zero-based) attempt
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Ollama API client
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    client: reqwest::Client,
    retry: RetryConfig,
}

impl OllamaClient {
    /// Create a new client. Chat calls can be slow on a cold model, so the
    /// request timeout is generous.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            retry: RetryConfig::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if Ollama is running
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);

        match self
            .client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Get current status
    pub async fn status(&self) -> OllamaStatus {
        if self.health_check().await.unwrap_or(false) {
            OllamaStatus::Running
        } else {
            OllamaStatus::Stopped
        }
    }

    /// List all available models
    pub async fn list_models(&self) -> Result<Vec<Model>> {
        let url = format!("{}/api/tags", self.base_url);

        let resp: TagsResponse = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to connect to Ollama")?
            .json()
            .await
            .context("Failed to parse models response")?;

        Ok(resp.models)
    }

    /// Single non-streaming chat turn, optionally with tools and an output format
    pub async fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        tools: Option<&[ToolDefinition]>,
        format: Option<&ResponseFormat>,
        options: Option<&ChatOptions>,
    ) -> Result<ChatResponse> {
        let url = format!("{}/api/chat", self.base_url);
        let request = ChatRequest {
            model,
            messages,
            stream: false,
            tools,
            format,
            options,
        };

        let mut attempt = 0;
        loop {
            debug!(model, messages = messages.len(), attempt, "Sending chat request");

            let result = self.client.post(&url).json(&request).send().await;
            let retryable = match result {
                Ok(resp) if resp.status().is_success() => {
                    return resp
                        .json::<ChatResponse>()
                        .await
                        .context("Failed to parse chat response");
                }
                Ok(resp) if resp.status().is_server_error() => {
                    format!("Ollama returned {}", resp.status())
                }
                Ok(resp) => {
                    let status = resp.status();
                    let body = resp.text().await.unwrap_or_default();
                    bail!("Chat request rejected ({}): {}", status, body);
                }
                Err(e) if e.is_connect() || e.is_timeout() => e.to_string(),
                Err(e) => return Err(e).context("Chat request failed"),
            };

            if attempt >= self.retry.max_retries {
                bail!(
                    "Chat request failed after {} attempt(s): {}",
                    attempt + 1,
                    retryable
                );
            }

            let backoff = self.retry.backoff_for(attempt);
            warn!(error = %retryable, ?backoff, "Transient chat failure, retrying");
            tokio::time::sleep(backoff).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chat_request_serialization() {
        let messages = vec![ChatMessage::system("be brief"), ChatMessage::user("hi")];
        let tools = vec![ToolDefinition::function(
            "get_exchange_rate",
            "Look up a rate",
            json!({"type": "object", "properties": {}}),
        )];
        let format = ResponseFormat::Json;
        let options = ChatOptions::default().with_temperature(0.2);

        let request = ChatRequest {
            model: "llama3.2",
            messages: &messages,
            stream: false,
            tools: Some(&tools),
            format: Some(&format),
            options: Some(&options),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["stream"], json!(false));
        assert_eq!(value["format"], json!("json"));
        assert_eq!(value["messages"][0]["role"], json!("system"));
        assert!(value["messages"][0].get("tool_calls").is_none());
        assert_eq!(value["tools"][0]["type"], json!("function"));
        assert_eq!(value["tools"][0]["function"]["name"], json!("get_exchange_rate"));
        assert!(value["options"].get("seed").is_none());
    }

    #[test]
    fn test_schema_format_serializes_inline() {
        let schema = json!({"type": "object", "required": ["status"]});
        let value = serde_json::to_value(ResponseFormat::Schema(schema.clone())).unwrap();
        assert_eq!(value, schema);
    }

    #[test]
    fn test_parse_tool_call_response() {
        let body = json!({
            "model": "llama3.2",
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [
                    {"function": {
                        "name": "get_exchange_rate",
                        "arguments": {"currency_from": "USD"}
                    }}
                ]
            },
            "done": true,
            "done_reason": "stop",
            "eval_count": 12
        });

        let resp: ChatResponse = serde_json::from_value(body).unwrap();
        assert!(resp.message.has_tool_calls());
        assert_eq!(resp.message.tool_calls[0].function.name, "get_exchange_rate");
        assert_eq!(resp.eval_count, Some(12));
    }

    #[test]
    fn test_tool_result_message() {
        let msg = ChatMessage::tool_result("get_exchange_rate", "{\"rates\":{}}");
        assert_eq!(msg.role, Role::Tool);
        assert!(!msg.has_tool_calls());
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["tool_name"], json!("get_exchange_rate"));
    }

    #[test]
    fn test_retry_backoff_is_capped() {
        let retry = RetryConfig::default();
        assert_eq!(retry.backoff_for(0), Duration::from_millis(500));
        assert_eq!(retry.backoff_for(1), Duration::from_secs(1));
        assert_eq!(retry.backoff_for(10), Duration::from_secs(5));
    }
}
