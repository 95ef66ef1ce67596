//! Currency conversion agent

use std::sync::Arc;

use futures::StreamExt;
use llm_core::{OllamaClient, OllamaStatus};
use tracing::{debug, info, instrument, warn};

use super::config::AgentConfig;
use super::engine::{OllamaEngine, ReasoningEngine};
use super::session::SessionStore;
use crate::error::{AgentError, Result};
use crate::mcp::{self, McpClient};
use crate::reconcile::{
    reconcile_updates, StatusReconciler, TaskUpdate, UpdateStream, VerdictSlot,
};

/// Answers currency questions through a model and the exchange-rate tool
pub struct CurrencyAgent {
    ollama_base_url: String,
    mcp_server_url: String,
    config: AgentConfig,
    sessions: Arc<SessionStore>,
    engine: Option<Arc<dyn ReasoningEngine>>,
    mcp: Option<Arc<McpClient>>,
}

impl CurrencyAgent {
    pub const SUPPORTED_CONTENT_TYPES: &'static [&'static str] = &["text", "text/plain"];

    pub fn new(
        ollama_base_url: impl Into<String>,
        mcp_server_url: impl Into<String>,
        config: AgentConfig,
    ) -> Self {
        Self {
            ollama_base_url: ollama_base_url.into(),
            mcp_server_url: mcp_server_url.into(),
            config,
            sessions: Arc::new(SessionStore::new()),
            engine: None,
            mcp: None,
        }
    }

    /// Use an already-built engine instead of connecting to Ollama and MCP
    pub fn with_engine(mut self, engine: Arc<dyn ReasoningEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Connect to the MCP server, load its tools and build the engine
    #[instrument(skip(self), fields(model = %self.config.model, mcp = %self.mcp_server_url))]
    pub async fn init_model_and_tools(&mut self) -> Result<()> {
        let client = OllamaClient::new(&self.ollama_base_url)
            .map_err(|e| AgentError::Engine(format!("{:#}", e)))?;
        check_model(&client, &self.config.model).await;

        let (mcp, registry) = mcp::create_registry(&self.mcp_server_url)
            .await
            .map_err(|e| AgentError::Engine(format!("{:#}", e)))?;

        if registry.is_empty() {
            warn!("MCP server exposes no tools");
        }
        info!(tools = ?registry.list_names(), "Agent ready");

        self.engine = Some(Arc::new(OllamaEngine::new(
            client,
            registry,
            self.config.clone(),
            Arc::clone(&self.sessions),
        )));
        self.mcp = Some(mcp);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.engine.is_some()
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    fn engine(&self) -> Result<&Arc<dyn ReasoningEngine>> {
        self.engine.as_ref().ok_or(AgentError::NotInitialized)
    }

    /// Stream the task updates for one query.
    ///
    /// Working updates arrive as tools are requested and answered; the last
    /// item is the terminal update, or an error if the engine faulted.
    pub fn stream<'a>(&'a self, query: &'a str, session_id: &'a str) -> Result<UpdateStream<'a>> {
        let slot = VerdictSlot::new();
        let events = self.engine()?.run(query, session_id, slot.clone());
        Ok(reconcile_updates(events, move || slot.take()))
    }

    /// Run a query to completion and return the terminal update
    pub async fn invoke(&self, query: &str, session_id: &str) -> Result<TaskUpdate> {
        let mut updates = self.stream(query, session_id)?;
        let mut last = None;
        while let Some(update) = updates.next().await {
            last = Some(update?);
        }
        Ok(last.unwrap_or_else(TaskUpdate::fallback))
    }

    /// Terminal update for the session's latest invocation. Re-reading is
    /// idempotent until the next invocation starts.
    pub fn agent_response(&self, session_id: &str) -> Result<TaskUpdate> {
        let engine = self.engine()?;
        Ok(StatusReconciler.reconcile(engine.verdict(session_id).as_ref()))
    }

    /// Release the MCP connection
    pub async fn shutdown(&self) {
        if let Some(mcp) = &self.mcp {
            if let Err(e) = mcp.close().await {
                warn!(error = %e, "Failed to close MCP client");
            }
        }
    }
}

/// Warn early when Ollama is down or the model has not been pulled. Neither
/// is fatal: Ollama may come up before the first request.
async fn check_model(client: &OllamaClient, model: &str) {
    if client.status().await == OllamaStatus::Stopped {
        warn!(url = %client.base_url(), "Ollama is not reachable");
        return;
    }

    match client.list_models().await {
        Ok(models) => {
            let tagged = format!("{}:", model);
            if !models.iter().any(|m| m.name == model || m.name.starts_with(&tagged)) {
                warn!(model, "Model not found locally; run `ollama pull {}`", model);
            }
        }
        Err(e) => debug!(error = %e, "Could not list models"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::testing::ScriptedEngine;
    use crate::reconcile::{
        ConversationEvent, StructuredVerdict, TaskPhase, VerdictStatus, FALLBACK_MESSAGE,
        LOOKING_UP_MESSAGE, PROCESSING_MESSAGE,
    };

    fn agent(engine: ScriptedEngine) -> CurrencyAgent {
        CurrencyAgent::new("http://unused", "http://unused/mcp", AgentConfig::default())
            .with_engine(Arc::new(engine))
    }

    #[tokio::test]
    async fn test_uninitialized_agent_refuses() {
        let agent =
            CurrencyAgent::new("http://unused", "http://unused/mcp", AgentConfig::default());
        assert!(!agent.is_initialized());
        assert!(matches!(agent.stream("q", "s"), Err(AgentError::NotInitialized)));
        assert!(matches!(agent.invoke("q", "s").await, Err(AgentError::NotInitialized)));
        assert!(matches!(agent.agent_response("s"), Err(AgentError::NotInitialized)));
    }

    #[tokio::test]
    async fn test_stream_emits_progress_then_artifact() {
        let agent = agent(ScriptedEngine::new(
            vec![
                ConversationEvent::assistant("", true),
                ConversationEvent::tool("{}"),
                ConversationEvent::assistant("done", false),
            ],
            Some(StructuredVerdict::new(VerdictStatus::Completed, "100 USD = 93.5 EUR")),
        ));

        let updates: Vec<TaskUpdate> = agent
            .stream("100 USD to EUR", "ctx")
            .unwrap()
            .map(|u| u.unwrap())
            .collect()
            .await;

        let messages: Vec<&str> = updates.iter().map(|u| u.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![LOOKING_UP_MESSAGE, PROCESSING_MESSAGE, "100 USD = 93.5 EUR"]
        );
        assert!(updates[2].artifact);
    }

    #[tokio::test]
    async fn test_agent_response_is_idempotent() {
        let agent = agent(ScriptedEngine::new(
            vec![],
            Some(StructuredVerdict::new(VerdictStatus::InputRequired, "Which target currency?")),
        ));

        let terminal = agent.invoke("convert 10 USD", "ctx").await.unwrap();
        assert_eq!(terminal.phase, TaskPhase::InputRequired);
        assert_eq!(agent.agent_response("ctx").unwrap(), terminal);
        assert_eq!(agent.agent_response("ctx").unwrap(), terminal);

        // Another session has no verdict of its own
        assert_eq!(agent.agent_response("other").unwrap().message, FALLBACK_MESSAGE);
    }

    #[tokio::test]
    async fn test_engine_fault_propagates_from_invoke() {
        let agent = agent(ScriptedEngine::failing(
            vec![ConversationEvent::assistant("", true)],
            "model crashed",
        ));
        match agent.invoke("q", "ctx").await {
            Err(AgentError::ProcessingFailed(msg)) => assert!(msg.contains("model crashed")),
            other => panic!("expected processing failure, got {:?}", other),
        }
    }
}
