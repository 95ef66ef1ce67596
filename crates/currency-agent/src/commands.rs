//! Subcommand implementations

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::StreamExt;
use llm_core::Config;
use tracing::info;
use uuid::Uuid;

use currency_agent::reconcile::TaskPhase;
use currency_agent::server::{self, AgentCard};
use currency_agent::{mcp, AgentConfig, CurrencyAgent};

use crate::ConnectionArgs;

/// Config file values with CLI/env overrides applied
#[derive(Debug, Clone)]
pub struct Settings {
    pub config: Config,
    pub ollama_url: String,
    pub mcp_url: String,
}

impl Settings {
    pub fn resolve(conn: ConnectionArgs) -> Self {
        let mut config = Config::try_load().unwrap_or_else(Config::default_minimal);
        if let Some(model) = conn.model {
            config.ollama.model = model;
        }

        let ollama_url = conn.ollama_host.unwrap_or_else(|| config.ollama_url());
        let mcp_url = conn
            .mcp_url
            .unwrap_or_else(|| config.agent.mcp_server_url.clone());

        Self {
            config,
            ollama_url,
            mcp_url,
        }
    }

    fn agent(&self) -> CurrencyAgent {
        CurrencyAgent::new(
            &self.ollama_url,
            &self.mcp_url,
            AgentConfig::from_config(&self.config),
        )
    }
}

pub async fn serve(
    mut settings: Settings,
    host: Option<String>,
    port: Option<u16>,
    public_url: Option<String>,
) -> Result<()> {
    if let Some(host) = host {
        settings.config.agent.host = host;
    }
    if let Some(port) = port {
        settings.config.agent.port = port;
    }
    if public_url.is_some() {
        settings.config.agent.public_url = public_url;
    }

    let mut agent = settings.agent();
    agent
        .init_model_and_tools()
        .await
        .context("Failed to initialize agent")?;
    info!(
        ollama = %settings.ollama_url,
        model = %settings.config.ollama.model,
        "Agent initialized"
    );

    let addr = format!("{}:{}", settings.config.agent.host, settings.config.agent.port);
    let public_url = settings.config.agent_public_url();
    let ttl = settings.config.session_ttl();
    server::serve(Arc::new(agent), &addr, &public_url, ttl).await
}

pub async fn ask(
    settings: Settings,
    query: &str,
    session: Option<String>,
    json: bool,
) -> Result<()> {
    if query.trim().is_empty() {
        anyhow::bail!("No query given");
    }

    let mut agent = settings.agent();
    agent
        .init_model_and_tools()
        .await
        .context("Failed to initialize agent")?;

    let session = session.unwrap_or_else(|| Uuid::new_v4().to_string());
    let mut stdout = std::io::stdout();

    {
        let mut updates = agent.stream(query, &session)?;
        while let Some(update) = updates.next().await {
            let update = update?;
            if json {
                writeln!(stdout, "{}", serde_json::to_string(&update)?)?;
            } else {
                let label = match update.phase {
                    TaskPhase::Working => "working",
                    TaskPhase::InputRequired => "input-required",
                    TaskPhase::Completed => "completed",
                };
                writeln!(stdout, "[{}] {}", label, update.message)?;
            }
        }
    }

    if !json {
        writeln!(stdout, "session: {}", session)?;
    }
    agent.shutdown().await;
    Ok(())
}

pub async fn tools(settings: Settings) -> Result<()> {
    let (client, registry) = mcp::create_registry(&settings.mcp_url).await?;

    for def in registry.tool_definitions() {
        println!("{}", def.function.name);
        println!("  {}", def.function.description);
        println!("  {}", serde_json::to_string(&def.function.parameters)?);
    }

    client.close().await
}

pub fn card(settings: Settings) -> Result<()> {
    let card = AgentCard::currency_agent(
        settings.config.agent_public_url(),
        CurrencyAgent::SUPPORTED_CONTENT_TYPES,
    );
    println!("{}", serde_json::to_string_pretty(&card)?);
    Ok(())
}
