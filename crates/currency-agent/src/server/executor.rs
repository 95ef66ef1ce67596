//! Drives the agent's update stream into task state

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use super::a2a::{Message, MessageSendParams, Part, Task, TaskIdParams, TaskState};
use super::tasks::{InMemoryTaskStore, TaskUpdater};
use crate::agent::CurrencyAgent;
use crate::reconcile::TaskPhase;

/// Name of the artifact holding a completed conversion
pub const ARTIFACT_NAME: &str = "conversion_result";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;
pub const TASK_NOT_FOUND: i64 = -32001;
pub const UNSUPPORTED_OPERATION: i64 = -32004;

/// Errors reported to A2A clients as JSON-RPC errors
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Method not found: {0}")]
    MethodNotFound(String),
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),
    #[error("Internal error: {0}")]
    Internal(String),
    #[error("Task not found: {0}")]
    TaskNotFound(String),
    #[error("This operation is not supported")]
    UnsupportedOperation,
}

impl ServerError {
    pub fn code(&self) -> i64 {
        match self {
            ServerError::Parse(_) => PARSE_ERROR,
            ServerError::InvalidRequest(_) => INVALID_REQUEST,
            ServerError::MethodNotFound(_) => METHOD_NOT_FOUND,
            ServerError::InvalidParams(_) => INVALID_PARAMS,
            ServerError::Internal(_) => INTERNAL_ERROR,
            ServerError::TaskNotFound(_) => TASK_NOT_FOUND,
            ServerError::UnsupportedOperation => UNSUPPORTED_OPERATION,
        }
    }
}

/// Runs the currency agent for A2A requests
pub struct CurrencyAgentExecutor {
    agent: Arc<CurrencyAgent>,
    tasks: Arc<InMemoryTaskStore>,
}

impl CurrencyAgentExecutor {
    pub fn new(agent: Arc<CurrencyAgent>, tasks: Arc<InMemoryTaskStore>) -> Self {
        Self { agent, tasks }
    }

    pub fn agent(&self) -> &Arc<CurrencyAgent> {
        &self.agent
    }

    pub fn tasks(&self) -> &Arc<InMemoryTaskStore> {
        &self.tasks
    }

    /// Drop sessions idle for longer than `ttl` together with their tasks,
    /// and any other finished task untouched for as long
    pub fn evict_idle(&self, ttl: Duration) {
        let contexts = self.agent.sessions().evict_idle(ttl);
        let tasks = self.tasks.evict(ttl, &contexts);
        if tasks > 0 || !contexts.is_empty() {
            info!(
                sessions = contexts.len(),
                tasks,
                remaining_tasks = self.tasks.len(),
                "Evicted idle state"
            );
        }
    }

    /// Run [`Self::evict_idle`] periodically for the life of the process
    pub fn start_eviction_task(self: Arc<Self>, ttl: Duration) {
        let period = ttl.clamp(Duration::from_secs(1), Duration::from_secs(60));
        debug!(?ttl, ?period, "Starting idle eviction");
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                self.evict_idle(ttl);
            }
        });
    }

    /// Find the task a message continues, or open a new one
    fn resolve_task(&self, message: &Message) -> Result<Task, ServerError> {
        let Some(task_id) = &message.task_id else {
            let task = Task::from_message(message);
            self.tasks.save(task.clone());
            return Ok(task);
        };

        let mut task = self
            .tasks
            .get(task_id)
            .ok_or_else(|| ServerError::TaskNotFound(task_id.clone()))?;

        if task.status.state.is_terminal() {
            return Err(ServerError::InvalidParams(format!(
                "Task {} is already {:?}",
                task_id, task.status.state
            )));
        }

        let mut next = message.clone();
        next.context_id = Some(task.context_id.clone());
        task.history.push(next);
        self.tasks.save(task.clone());
        Ok(task)
    }

    /// Handle `message/send`: run the agent until its terminal update and
    /// return the resulting task.
    #[instrument(skip(self, params), fields(message_id = %params.message.message_id))]
    pub async fn execute(&self, params: MessageSendParams) -> Result<Task, ServerError> {
        let query = params.message.text();
        if query.trim().is_empty() {
            return Err(ServerError::InvalidParams(
                "message must contain a non-empty text part".to_string(),
            ));
        }

        let task = self.resolve_task(&params.message)?;
        info!(task_id = %task.id, context_id = %task.context_id, "Executing task");

        let mut updater = TaskUpdater::new(Arc::clone(&self.tasks), &task.id, &task.context_id);
        if let Err(e) = self.drive(&query, &mut updater).await {
            error!(
                task_id = %task.id,
                error = %e,
                "An error occurred while streaming the response"
            );
            if !updater.is_final() {
                let message = updater.agent_message(format!("Task failed: {}", e));
                if let Err(fail) = updater.failed(message) {
                    warn!(task_id = %task.id, error = %fail, "Could not mark task failed");
                }
            }
            return Err(e);
        }

        self.tasks
            .get(&task.id)
            .ok_or_else(|| ServerError::TaskNotFound(task.id.clone()))
    }

    async fn drive(&self, query: &str, updater: &mut TaskUpdater) -> Result<(), ServerError> {
        let internal = |e: anyhow::Error| ServerError::Internal(format!("{:#}", e));

        let context_id = updater.context_id().to_string();
        let mut updates = self
            .agent
            .stream(query, &context_id)
            .map_err(|e| ServerError::Internal(e.to_string()))?;

        while let Some(update) = updates.next().await {
            let update = update.map_err(|e| ServerError::Internal(e.to_string()))?;
            let message = updater.agent_message(&update.message);

            match update.phase {
                TaskPhase::Working => {
                    updater
                        .update_status(TaskState::Working, Some(message), false)
                        .map_err(internal)?;
                }
                TaskPhase::InputRequired => {
                    updater
                        .update_status(TaskState::InputRequired, Some(message), true)
                        .map_err(internal)?;
                    break;
                }
                TaskPhase::Completed => {
                    updater
                        .add_artifact(vec![Part::text(update.message)], ARTIFACT_NAME)
                        .map_err(internal)?;
                    updater.complete().map_err(internal)?;
                    break;
                }
            }
        }

        if !updater.is_final() {
            return Err(ServerError::Internal(
                "agent stream ended without a final update".to_string(),
            ));
        }
        Ok(())
    }

    /// Cancellation is not offered by this agent
    pub async fn cancel(&self, params: TaskIdParams) -> Result<Task, ServerError> {
        if self.tasks.get(&params.id).is_none() {
            return Err(ServerError::TaskNotFound(params.id));
        }
        Err(ServerError::UnsupportedOperation)
    }
}
