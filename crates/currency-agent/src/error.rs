//! Agent error types

use thiserror::Error;

/// Faults that cross the reconciliation boundary.
///
/// An unrecognized verdict is deliberately absent here: it reconciles to
/// the fallback update instead of failing.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Reconciliation requested before the reasoning engine exists
    #[error("Agent not initialized. Call init_model_and_tools first.")]
    NotInitialized,

    /// Fault raised while pulling conversation events
    #[error("processing failed: {0}")]
    ProcessingFailed(String),

    /// The reasoning engine could not be built (model or tool server unreachable)
    #[error("engine setup failed: {0}")]
    Engine(String),
}

pub type Result<T> = std::result::Result<T, AgentError>;
