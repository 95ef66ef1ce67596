//! exchange-mcp: MCP server exposing `get_exchange_rate`
//!
//! Run: `exchange-mcp --port 9080`

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use llm_core::Config;
use tracing_subscriber::EnvFilter;

use exchange_mcp::{server, ExchangeServer, RateClient};

#[derive(Debug, Parser)]
#[command(name = "exchange-mcp")]
#[command(about = "MCP server for currency exchange rates", version)]
struct Args {
    /// Address to bind (overrides currency.toml)
    #[arg(long, env = "EXCHANGE_HOST")]
    host: Option<String>,

    /// Port to bind (overrides currency.toml)
    #[arg(short, long, env = "EXCHANGE_PORT")]
    port: Option<u16>,

    /// Base URL of the rate API
    #[arg(long, env = "EXCHANGE_API_URL")]
    api_url: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::try_load().unwrap_or_else(Config::default_minimal);
    let exchange = config.exchange;

    let host = args.host.unwrap_or(exchange.host);
    let port = args.port.unwrap_or(exchange.port);
    let api_url = args.api_url.unwrap_or(exchange.api_base_url);

    let rates = RateClient::new(api_url, Duration::from_secs(exchange.timeout_secs))?;
    tracing::info!(api = %rates.base_url(), "Using rate API");

    server::serve(ExchangeServer::new(rates), &format!("{}:{}", host, port)).await
}
