//! Response reconciliation
//!
//! Turns the conversation events of one reasoning pass, plus the verdict the
//! engine hands over at the end, into the ordered task updates a task sink
//! consumes:
//!
//! ```text
//!   events ──► TurnObserver ──► working, working, ...
//!                                          │ (events exhausted)
//!   verdict ─► StatusReconciler ─────────► terminal update
//! ```
//!
//! Exactly one terminal update closes every invocation that runs to the
//! end. A fault while pulling events ends the stream with an error instead,
//! and the caller owns the terminal notification.

use std::pin::Pin;
use std::sync::Arc;

use async_stream::stream;
use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::AgentError;

pub const LOOKING_UP_MESSAGE: &str = "Looking up the exchange rates...";
pub const PROCESSING_MESSAGE: &str = "Processing the exchange rates..";
pub const FALLBACK_MESSAGE: &str =
    "We are unable to process your request at the moment. Please try again.";

/// Ordered conversation events of one invocation
pub type EventStream<'a> =
    Pin<Box<dyn Stream<Item = anyhow::Result<ConversationEvent>> + Send + 'a>>;

/// Ordered task updates of one invocation
pub type UpdateStream<'a> =
    Pin<Box<dyn Stream<Item = Result<TaskUpdate, AgentError>> + Send + 'a>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventRole {
    Assistant,
    Tool,
}

/// One turn produced by the reasoning engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationEvent {
    pub role: EventRole,
    /// Only meaningful for assistant events
    pub has_tool_request: bool,
    pub content: String,
}

impl ConversationEvent {
    pub fn assistant(content: impl Into<String>, has_tool_request: bool) -> Self {
        Self {
            role: EventRole::Assistant,
            has_tool_request,
            content: content.into(),
        }
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self {
            role: EventRole::Tool,
            has_tool_request: false,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictStatus {
    InputRequired,
    Completed,
    Error,
    #[serde(other)]
    Unrecognized,
}

/// Final classification of one reasoning pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredVerdict {
    #[serde(default)]
    pub status: Option<VerdictStatus>,
    #[serde(default)]
    pub message: String,
}

impl StructuredVerdict {
    pub fn new(status: VerdictStatus, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Parse the model's structured answer. Returns `None` when the text is
    /// not a JSON object at all; an unknown or missing status still parses.
    pub fn parse(text: &str) -> Option<Self> {
        match serde_json::from_str::<Self>(text.trim()) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(error = %e, "Structured response is not a verdict object");
                None
            }
        }
    }
}

/// Verdict handoff owned by a single invocation.
///
/// The engine fills it when its event stream ends; the reconciler takes it
/// once the events are exhausted. Concurrent invocations on the same session
/// each get their own slot.
#[derive(Debug, Clone, Default)]
pub struct VerdictSlot(Arc<Mutex<Option<StructuredVerdict>>>);

impl VerdictSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, verdict: Option<StructuredVerdict>) {
        *self.0.lock() = verdict;
    }

    pub fn take(&self) -> Option<StructuredVerdict> {
        self.0.lock().take()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPhase {
    Working,
    InputRequired,
    Completed,
}

/// Signal emitted towards the task sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskUpdate {
    pub phase: TaskPhase,
    pub message: String,
    pub is_final: bool,
    /// The message is a deliverable to record as an artifact
    pub artifact: bool,
}

impl TaskUpdate {
    pub fn working(message: impl Into<String>) -> Self {
        Self {
            phase: TaskPhase::Working,
            message: message.into(),
            is_final: false,
            artifact: false,
        }
    }

    pub fn input_required(message: impl Into<String>) -> Self {
        Self {
            phase: TaskPhase::InputRequired,
            message: message.into(),
            is_final: true,
            artifact: false,
        }
    }

    pub fn completed(message: impl Into<String>) -> Self {
        Self {
            phase: TaskPhase::Completed,
            message: message.into(),
            is_final: true,
            artifact: true,
        }
    }

    pub fn fallback() -> Self {
        Self::input_required(FALLBACK_MESSAGE)
    }
}

/// What an event means for progress reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    ToolRequested,
    ToolResponded,
    Ignored,
}

/// Maps tool-invocation boundaries to working updates
#[derive(Debug, Default, Clone, Copy)]
pub struct TurnObserver;

impl TurnObserver {
    pub fn classify(&self, event: &ConversationEvent) -> Observation {
        match event.role {
            EventRole::Assistant if event.has_tool_request => Observation::ToolRequested,
            EventRole::Tool => Observation::ToolResponded,
            _ => Observation::Ignored,
        }
    }

    pub fn observe(&self, event: &ConversationEvent) -> Option<TaskUpdate> {
        match self.classify(event) {
            Observation::ToolRequested => Some(TaskUpdate::working(LOOKING_UP_MESSAGE)),
            Observation::ToolResponded => Some(TaskUpdate::working(PROCESSING_MESSAGE)),
            Observation::Ignored => None,
        }
    }
}

/// Maps the verdict to the single terminal update
#[derive(Debug, Default, Clone, Copy)]
pub struct StatusReconciler;

impl StatusReconciler {
    pub fn reconcile(&self, verdict: Option<&StructuredVerdict>) -> TaskUpdate {
        let Some(verdict) = verdict else {
            return TaskUpdate::fallback();
        };

        match verdict.status {
            Some(VerdictStatus::InputRequired) => TaskUpdate::input_required(&verdict.message),
            // Errors surface as a user-actionable state, not a failed task
            Some(VerdictStatus::Error) => TaskUpdate::input_required(&verdict.message),
            Some(VerdictStatus::Completed) => TaskUpdate::completed(&verdict.message),
            Some(VerdictStatus::Unrecognized) | None => TaskUpdate::fallback(),
        }
    }
}

/// Drive one invocation: observe events in arrival order, then reconcile.
///
/// `verdict` is only consulted once the event stream is exhausted. Dropping
/// the returned stream stops pulling events.
pub fn reconcile_updates<'a, F>(events: EventStream<'a>, verdict: F) -> UpdateStream<'a>
where
    F: FnOnce() -> Option<StructuredVerdict> + Send + 'a,
{
    Box::pin(stream! {
        let observer = TurnObserver;
        let mut events = events;

        while let Some(item) = events.next().await {
            match item {
                Ok(event) => {
                    if let Some(update) = observer.observe(&event) {
                        yield Ok(update);
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Event stream failed");
                    yield Err(AgentError::ProcessingFailed(format!("{:#}", e)));
                    return;
                }
            }
        }

        let verdict = verdict();
        debug!(status = ?verdict.as_ref().and_then(|v| v.status), "Reconciling verdict");
        yield Ok(StatusReconciler.reconcile(verdict.as_ref()));
    })
}
