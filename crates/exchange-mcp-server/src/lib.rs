//! Exchange-rate MCP server
//!
//! Exposes a single `get_exchange_rate` tool over the MCP streamable-HTTP
//! transport. Lookups go to a Frankfurter-compatible rate API; every failure
//! is reported as an `{"error": ...}` payload so the calling model can
//! recover on its next turn.

pub mod protocol;
pub mod rates;
pub mod server;

pub use rates::{ExchangeRateArgs, RateClient};
pub use server::{router, ExchangeServer};
