//! currency-agent: A2A currency conversion agent
//!
//! Run: `currency-agent serve` (needs Ollama and `exchange-mcp` running)

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "currency-agent")]
#[command(about = "Currency conversion agent over A2A", version)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    conn: ConnectionArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Endpoints shared by every subcommand (each overrides currency.toml)
#[derive(Debug, Clone, Args)]
pub struct ConnectionArgs {
    /// Ollama base URL, e.g. http://127.0.0.1:11434
    #[arg(long, env = "OLLAMA_HOST", global = true)]
    pub ollama_host: Option<String>,

    /// Model to use
    #[arg(short, long, env = "OLLAMA_MODEL", global = true)]
    pub model: Option<String>,

    /// Streamable-HTTP URL of the exchange-rate MCP server
    #[arg(long, env = "MCP_SERVER_URL", global = true)]
    pub mcp_url: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the A2A server
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to bind
        #[arg(short, long, env = "AGENT_PORT")]
        port: Option<u16>,

        /// URL advertised in the agent card
        #[arg(long)]
        public_url: Option<String>,
    },

    /// One-shot query, printing each task update
    Ask {
        /// The question to send
        query: Vec<String>,

        /// Session to continue (new one if omitted)
        #[arg(short, long)]
        session: Option<String>,

        /// Output updates as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// List the tools exposed by the MCP server
    Tools,

    /// Print the agent card
    Card,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let settings = commands::Settings::resolve(cli.conn);

    match cli.command {
        Commands::Serve {
            host,
            port,
            public_url,
        } => commands::serve(settings, host, port, public_url).await,
        Commands::Ask {
            query,
            session,
            json,
        } => commands::ask(settings, &query.join(" "), session, json).await,
        Commands::Tools => commands::tools(settings).await,
        Commands::Card => commands::card(settings),
    }
}
