//! Reasoning engine: a tool-calling chat loop over Ollama
//!
//! One invocation produces the ordered conversation events the reconciler
//! observes, then checkpoints a structured verdict under the session id.

use std::sync::Arc;

use async_stream::stream;
use llm_core::{ChatMessage, ChatOptions, OllamaClient, ResponseFormat};
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use super::config::{AgentConfig, VERDICT_INSTRUCTION};
use super::session::SessionStore;
use crate::reconcile::{ConversationEvent, EventStream, StructuredVerdict, VerdictSlot};
use crate::tools::ToolRegistry;

/// Source of conversation events and verdicts
pub trait ReasoningEngine: Send + Sync {
    /// Run one invocation for `query` in the given session.
    ///
    /// The invocation's verdict is written to `verdict` before the returned
    /// stream ends. Invocations on one session run one at a time.
    fn run<'a>(
        &'a self,
        query: &'a str,
        session_id: &'a str,
        verdict: VerdictSlot,
    ) -> EventStream<'a>;

    /// Verdict checkpointed by the session's latest completed invocation
    fn verdict(&self, session_id: &str) -> Option<StructuredVerdict>;
}

/// JSON schema handed to Ollama for the structured pass
pub fn verdict_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "status": {
                "type": "string",
                "enum": ["input_required", "completed", "error"]
            },
            "message": { "type": "string" }
        },
        "required": ["status", "message"]
    })
}

/// ReAct-style engine backed by an Ollama model and MCP tools
pub struct OllamaEngine {
    client: OllamaClient,
    registry: ToolRegistry,
    config: AgentConfig,
    sessions: Arc<SessionStore>,
}

impl OllamaEngine {
    pub fn new(
        client: OllamaClient,
        registry: ToolRegistry,
        config: AgentConfig,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self {
            client,
            registry,
            config,
            sessions,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    fn options(&self) -> ChatOptions {
        ChatOptions::default().with_temperature(self.config.temperature)
    }

    /// Ask the model to classify the conversation so far.
    ///
    /// An unparseable answer yields no verdict; only transport faults are errors.
    #[instrument(skip(self, messages), fields(model = %self.config.model))]
    async fn structured_verdict(
        &self,
        messages: &[ChatMessage],
    ) -> anyhow::Result<Option<StructuredVerdict>> {
        let mut prompt = messages.to_vec();
        prompt.push(ChatMessage::system(VERDICT_INSTRUCTION));

        let response = self
            .client
            .chat(
                &self.config.model,
                &prompt,
                None,
                Some(&ResponseFormat::Schema(verdict_schema())),
                Some(&self.options()),
            )
            .await?;

        debug!(content = %response.message.content, "Structured response");
        Ok(StructuredVerdict::parse(&response.message.content))
    }
}

impl ReasoningEngine for OllamaEngine {
    fn run<'a>(
        &'a self,
        query: &'a str,
        session_id: &'a str,
        slot: VerdictSlot,
    ) -> EventStream<'a> {
        Box::pin(stream! {
            let _guard = self.sessions.lock(session_id).await;
            let mut messages = self.sessions.begin_invocation(session_id);
            if messages.is_empty() {
                messages.push(ChatMessage::system(&self.config.system_prompt));
            }
            messages.push(ChatMessage::user(query));

            let tools = self.registry.tool_definitions();
            let options = self.options();
            info!(session_id, tools = tools.len(), "Starting invocation");

            let mut iteration = 0;
            loop {
                if iteration >= self.config.max_iterations {
                    warn!(session_id, iteration, "Iteration limit reached");
                    break;
                }
                iteration += 1;
                debug!(session_id, iteration, messages = messages.len(), "Calling model");

                let response = match self
                    .client
                    .chat(&self.config.model, &messages, Some(&tools), None, Some(&options))
                    .await
                {
                    Ok(r) => r,
                    Err(e) => {
                        yield Err(e.context("Model call failed"));
                        return;
                    }
                };

                let message = response.message;
                let calls = message.tool_calls.clone();
                yield Ok(ConversationEvent::assistant(message.content.clone(), !calls.is_empty()));
                messages.push(message);

                if calls.is_empty() {
                    break;
                }

                for call in calls {
                    let name = call.function.name;
                    let result = self.registry.execute(&name, &call.function.arguments).await;
                    debug!(session_id, tool = %name, success = result.success, "Tool finished");

                    let content = result.to_message_content();
                    yield Ok(ConversationEvent::tool(content.clone()));
                    messages.push(ChatMessage::tool_result(name, content));
                }
            }

            let verdict = match self.structured_verdict(&messages).await {
                Ok(v) => v,
                Err(e) => {
                    yield Err(e.context("Structured response failed"));
                    return;
                }
            };
            self.sessions.finish_invocation(session_id, messages, verdict.clone());
            slot.set(verdict);
        })
    }

    fn verdict(&self, session_id: &str) -> Option<StructuredVerdict> {
        self.sessions.verdict(session_id)
    }
}
