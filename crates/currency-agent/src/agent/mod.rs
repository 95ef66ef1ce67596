//! Currency agent: reasoning engine, session store and the facade that
//! feeds engine output through reconciliation.

mod config;
mod currency;
mod engine;
mod session;

pub use config::{AgentConfig, SYSTEM_INSTRUCTION};
pub use currency::CurrencyAgent;
pub use engine::{verdict_schema, OllamaEngine, ReasoningEngine};
pub use session::{SessionState, SessionStore};
