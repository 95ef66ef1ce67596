//! A2A task server
//!
//! ```text
//! POST / (message/send) ──► CurrencyAgentExecutor ──► CurrencyAgent::stream
//!                                 │                          │
//!                                 ▼                          ▼
//!                          TaskUpdater ◄──── TaskUpdate (working / final)
//!                                 │
//!                                 ▼
//!                          InMemoryTaskStore ◄── tasks/get
//! ```

pub mod a2a;
pub mod executor;
pub mod http;
pub mod tasks;

pub use a2a::AgentCard;
pub use executor::{CurrencyAgentExecutor, ServerError};
pub use http::{router, AppState, AGENT_CARD_PATH};
pub use tasks::{InMemoryTaskStore, TaskUpdater};

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use crate::agent::CurrencyAgent;

/// Bind and serve until the process exits. Sessions and tasks idle for
/// longer than `session_ttl` are evicted in the background.
pub async fn serve(
    agent: Arc<CurrencyAgent>,
    addr: &str,
    public_url: &str,
    session_ttl: Duration,
) -> Result<()> {
    let card = AgentCard::currency_agent(public_url, CurrencyAgent::SUPPORTED_CONTENT_TYPES);
    let executor = Arc::new(CurrencyAgentExecutor::new(
        agent,
        Arc::new(InMemoryTaskStore::new()),
    ));
    Arc::clone(&executor).start_eviction_task(session_ttl);
    let state = AppState {
        executor,
        card: Arc::new(card),
    };

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    let card_url = format!("{}{}", public_url.trim_end_matches('/'), AGENT_CARD_PATH);
    info!(addr = %listener.local_addr()?, card = %card_url, "A2A server listening");

    axum::serve(listener, router(state)).await?;
    Ok(())
}
