//! currency-agent: answers currency-conversion questions over A2A
//!
//! A model-driven tool loop (Ollama + MCP exchange-rate tool) produces
//! conversation events; [`reconcile`] turns them into the task updates an
//! A2A task server publishes.

pub mod agent;
pub mod error;
pub mod mcp;
pub mod reconcile;
pub mod server;
pub mod tools;

pub use agent::{AgentConfig, CurrencyAgent};
pub use error::AgentError;
pub use reconcile::{
    ConversationEvent, StatusReconciler, StructuredVerdict, TaskPhase, TaskUpdate, TurnObserver,
};
