//! Channel construction

use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint};
use tracing::info;

use crate::config::{ChannelConfig, TlsMode};
use crate::error::Result;
use crate::proto::{VcChannelClient, VcServiceClient};

/// Build the endpoint for the node, with keepalive and TLS applied.
pub fn endpoint(config: &ChannelConfig) -> Result<Endpoint> {
    let mut endpoint = Endpoint::from_shared(config.endpoint_uri())?
        .http2_keep_alive_interval(config.keep_alive_interval)
        .keep_alive_while_idle(config.keep_alive_while_idle);

    endpoint = match &config.tls {
        TlsMode::Local => endpoint,
        TlsMode::SystemRoots => endpoint.tls_config(ClientTlsConfig::new().with_native_roots())?,
        TlsMode::CustomRoot(pem) => {
            endpoint.tls_config(ClientTlsConfig::new().ca_certificate(Certificate::from_pem(pem)))?
        }
    };

    Ok(endpoint)
}

/// Create the VC service client. Connection happens on first use, so this
/// succeeds even when the node is not reachable yet.
pub fn connect_lazy(config: &ChannelConfig) -> Result<VcChannelClient> {
    let channel: Channel = endpoint(config)?.connect_lazy();
    info!(
        uri = %config.endpoint_uri(),
        tls = tls_label(&config.tls),
        "Identity node channel ready"
    );

    Ok(VcServiceClient::new(channel)
        .max_decoding_message_size(config.max_message_size)
        .max_encoding_message_size(config.max_message_size))
}

fn tls_label(mode: &TlsMode) -> &'static str {
    match mode {
        TlsMode::Local => "local",
        TlsMode::SystemRoots => "system-roots",
        TlsMode::CustomRoot(_) => "custom-root",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_uri_for_local() {
        let config = ChannelConfig {
            server_url: "127.0.0.1:4001".to_string(),
            tls: TlsMode::Local,
            ..ChannelConfig::default()
        };
        let endpoint = endpoint(&config).unwrap();
        assert!(endpoint.uri().to_string().starts_with("http://127.0.0.1:4001"));
    }

    #[test]
    fn test_invalid_uri_is_transport_error() {
        let config = ChannelConfig {
            server_url: "http://exa mple:1".to_string(),
            tls: TlsMode::Local,
            ..ChannelConfig::default()
        };
        assert!(matches!(endpoint(&config), Err(crate::IdentityError::Transport(_))));
    }

    #[tokio::test]
    async fn test_connect_lazy_without_node() {
        let config = ChannelConfig {
            server_url: "127.0.0.1:9".to_string(),
            tls: TlsMode::Local,
            ..ChannelConfig::default()
        };
        assert!(connect_lazy(&config).is_ok());
    }
}
