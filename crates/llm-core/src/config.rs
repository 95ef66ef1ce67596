//! Configuration management for currency.toml

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the workspace configuration file
pub const CONFIG_FILE_NAME: &str = "currency.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub exchange: ExchangeConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub host: String,
    pub port: u16,
    pub model: String,
    pub temperature: f32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 11434,
            model: "llama3.2".to_string(),
            temperature: 0.2,
        }
    }
}

/// A2A agent server settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub host: String,
    pub port: u16,
    /// Streamable-HTTP endpoint of the exchange-rate MCP server
    pub mcp_server_url: String,
    pub max_iterations: usize,
    /// URL advertised in the agent card; derived from host/port when unset
    pub public_url: Option<String>,
    /// Sessions and their tasks idle for longer than this are evicted
    pub session_ttl_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9091,
            mcp_server_url: "http://127.0.0.1:9080/mcp".to_string(),
            max_iterations: 10,
            public_url: None,
            session_ttl_secs: 3600,
        }
    }
}

/// Exchange-rate MCP server settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    pub host: String,
    pub port: u16,
    pub api_base_url: String,
    pub timeout_secs: u64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9080,
            api_base_url: "https://api.frankfurter.app".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Config {
    /// Load configuration from currency.toml
    pub fn load() -> Result<Self> {
        Self::load_from(Self::find_config_path()?)
    }

    /// Try to load configuration, returning None if not found
    pub fn try_load() -> Option<Self> {
        Self::load().ok()
    }

    /// Configuration used when currency.toml is missing
    pub fn default_minimal() -> Self {
        Self {
            ollama: OllamaConfig::default(),
            agent: AgentConfig::default(),
            exchange: ExchangeConfig::default(),
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read {}", path.as_ref().display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.as_ref().display()))
    }

    /// Find currency.toml by searching current directory and parents
    pub fn find_config_path() -> Result<PathBuf> {
        Self::find_config_path_from(std::env::current_dir()?)
    }

    fn find_config_path_from(mut current: PathBuf) -> Result<PathBuf> {
        for _ in 0..10 {
            let candidate = current.join(CONFIG_FILE_NAME);
            if candidate.exists() {
                return Ok(candidate);
            }
            if !current.pop() {
                break;
            }
        }

        anyhow::bail!("{} not found in current directory or parents", CONFIG_FILE_NAME)
    }

    /// Get Ollama base URL
    pub fn ollama_url(&self) -> String {
        format!("http://{}:{}", self.ollama.host, self.ollama.port)
    }

    /// URL the agent advertises in its card. A wildcard bind address is
    /// not reachable by clients, so it is advertised as loopback.
    pub fn agent_public_url(&self) -> String {
        if let Some(url) = &self.agent.public_url {
            return url.clone();
        }
        let host = match self.agent.host.as_str() {
            "0.0.0.0" => "127.0.0.1",
            "::" | "[::]" => "[::1]",
            host => host,
        };
        format!("http://{}:{}", host, self.agent.port)
    }

    /// Idle time after which the agent server evicts a session
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.agent.session_ttl_secs)
    }
}
