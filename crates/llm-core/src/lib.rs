//! llm-core: Shared library for the currency agent workspace
//!
//! Provides:
//! - Configuration loading (currency.toml)
//! - Ollama chat client with tool calling and structured output

pub mod config;
pub mod ollama;

pub use config::Config;
pub use ollama::{
    ChatMessage, ChatOptions, ChatResponse, FunctionCall, FunctionDefinition, Model,
    OllamaClient, OllamaStatus, ResponseFormat, RetryConfig, Role, ToolCall, ToolDefinition,
};
