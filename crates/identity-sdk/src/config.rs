//! Channel configuration from the environment
//!
//! [`ChannelConfig::from_lookup`] is a pure function of the variables it is
//! given, so identical environments always yield identical configuration.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

use crate::constants::*;
use crate::error::{IdentityError, Result};

/// How the channel authenticates the node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsMode {
    /// Plaintext; only meant for a node on the local host
    Local,
    /// TLS verified against the system trust store
    SystemRoots,
    /// TLS verified against a caller-supplied root CA (PEM)
    CustomRoot(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    /// `host:port` of the node, as configured
    pub server_url: String,
    pub tls: TlsMode,
    pub max_message_size: usize,
    pub keep_alive_interval: Duration,
    pub keep_alive_while_idle: bool,
    pub http2_max_pings_without_data: u32,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_GRPC_URL.to_string(),
            tls: TlsMode::SystemRoots,
            max_message_size: GRPC_MAX_MESSAGE_LENGTH,
            keep_alive_interval: GRPC_KEEP_ALIVE_TIME,
            keep_alive_while_idle: GRPC_KEEP_ALIVE_PERMIT_WITHOUT_CALLS,
            http2_max_pings_without_data: GRPC_HTTP2_MAX_PINGS_WITHOUT_DATA,
        }
    }
}

fn flag(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: i64) -> Result<i64> {
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| {
            IdentityError::Config(format!("{} must be an integer, got {:?}", name, raw))
        }),
    }
}

impl ChannelConfig {
    /// Read the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server_url =
            lookup(ENV_GRPC_SERVER_URL).unwrap_or_else(|| DEFAULT_GRPC_URL.to_string());
        let use_ssl = flag(&lookup, ENV_USE_SSL, 1)?;
        let use_insecure = flag(&lookup, ENV_USE_INSECURE, 0)?;
        debug!(server_url = %server_url, use_ssl, use_insecure, "Identity node channel");

        let tls = match (use_ssl, use_insecure) {
            (1, 1) => {
                let encoded = lookup(ENV_INSECURE_ROOT_CA).ok_or_else(|| {
                    IdentityError::Config(format!(
                        "{} is required when {}=1",
                        ENV_INSECURE_ROOT_CA, ENV_USE_INSECURE
                    ))
                })?;
                TlsMode::CustomRoot(STANDARD.decode(encoded.trim())?)
            }
            (1, _) => TlsMode::SystemRoots,
            _ => TlsMode::Local,
        };

        Ok(Self {
            server_url,
            tls,
            ..Self::default()
        })
    }

    /// URI handed to the transport, with a scheme matching the TLS mode
    pub fn endpoint_uri(&self) -> String {
        if self.server_url.contains("://") {
            return self.server_url.clone();
        }
        let scheme = match self.tls {
            TlsMode::Local => "http",
            TlsMode::SystemRoots | TlsMode::CustomRoot(_) => "https",
        };
        format!("{}://{}", scheme, self.server_url)
    }
}
