//! Badge lookup and verification

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::client;
use crate::config::ChannelConfig;
use crate::error::{IdentityError, Result};
use crate::log;
use crate::proto::{
    EnvelopedCredential, GetVcWellKnownRequest, GetVcWellKnownResponse, VcChannelClient,
    VerificationResult, VerifyRequest,
};

/// The VC service RPCs the SDK depends on
#[async_trait]
pub trait VcService: Send + Sync {
    async fn get_well_known(
        &self,
        request: GetVcWellKnownRequest,
    ) -> Result<GetVcWellKnownResponse>;

    async fn verify(&self, request: VerifyRequest) -> Result<VerificationResult>;
}

#[async_trait]
impl VcService for VcChannelClient {
    async fn get_well_known(
        &self,
        request: GetVcWellKnownRequest,
    ) -> Result<GetVcWellKnownResponse> {
        // Clones share the underlying channel
        let mut client = self.clone();
        Ok(VcChannelClient::get_well_known(&mut client, request)
            .await?
            .into_inner())
    }

    async fn verify(&self, request: VerifyRequest) -> Result<VerificationResult> {
        let mut client = self.clone();
        Ok(VcChannelClient::verify(&mut client, request).await?.into_inner())
    }
}

pub struct IdentitySdk<S = VcChannelClient> {
    service: S,
}

impl IdentitySdk<VcChannelClient> {
    /// Configure from the environment and open a lazy channel to the node.
    /// Must be called inside a tokio runtime.
    pub fn new() -> Result<Self> {
        log::init_from_env();
        Self::with_config(&ChannelConfig::from_env()?)
    }

    pub fn with_config(config: &ChannelConfig) -> Result<Self> {
        Ok(Self::with_service(client::connect_lazy(config)?))
    }
}

impl<S: VcService> IdentitySdk<S> {
    pub fn with_service(service: S) -> Self {
        Self { service }
    }

    /// First credential published for `id`
    pub async fn get_badge(&self, id: &str) -> Result<EnvelopedCredential> {
        debug!(id, "Fetching badge");
        let response = self
            .service
            .get_well_known(GetVcWellKnownRequest { id: id.to_string() })
            .await?;

        if response.vcs.len() > 1 {
            debug!(
                id,
                count = response.vcs.len(),
                "Multiple badges published, using the first"
            );
        }
        response
            .vcs
            .into_iter()
            .next()
            .ok_or_else(|| IdentityError::BadgeNotFound(id.to_string()))
    }

    pub async fn verify_badge(&self, badge: EnvelopedCredential) -> Result<VerificationResult> {
        let result = self.service.verify(VerifyRequest { vc: Some(badge) }).await?;
        if !result.status {
            warn!(errors = result.errors.len(), "Badge failed verification");
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::{CredentialEnvelopeType, ErrorInfo, ErrorReason};
    use std::sync::Mutex;

    struct MockService {
        vcs: Vec<EnvelopedCredential>,
        verified: Mutex<Vec<VerifyRequest>>,
    }

    impl MockService {
        fn new(vcs: Vec<EnvelopedCredential>) -> Self {
            Self {
                vcs,
                verified: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl VcService for MockService {
        async fn get_well_known(
            &self,
            request: GetVcWellKnownRequest,
        ) -> Result<GetVcWellKnownResponse> {
            if request.id == "unavailable" {
                return Err(tonic::Status::unavailable("node down").into());
            }
            Ok(GetVcWellKnownResponse { vcs: self.vcs.clone() })
        }

        async fn verify(&self, request: VerifyRequest) -> Result<VerificationResult> {
            let valid = request
                .vc
                .as_ref()
                .and_then(|vc| vc.value.as_deref())
                .is_some_and(|v| v.starts_with("valid"));
            self.verified.lock().unwrap().push(request);

            let mut result = VerificationResult {
                status: valid,
                controller: "did:web:issuer".to_string(),
                ..Default::default()
            };
            if !valid {
                result.errors.push(ErrorInfo {
                    reason: ErrorReason::InvalidProof as i32,
                    message: "bad signature".to_string(),
                });
            }
            Ok(result)
        }
    }

    fn badge(value: &str) -> EnvelopedCredential {
        EnvelopedCredential {
            envelope_type: Some(CredentialEnvelopeType::Jose as i32),
            value: Some(value.to_string()),
        }
    }

    #[tokio::test]
    async fn test_get_badge_returns_first() {
        let sdk = IdentitySdk::with_service(MockService::new(vec![
            badge("valid-1"),
            badge("valid-2"),
        ]));
        let vc = sdk.get_badge("agent-1").await.unwrap();
        assert_eq!(vc.value.as_deref(), Some("valid-1"));
    }

    #[tokio::test]
    async fn test_get_badge_not_found() {
        let sdk = IdentitySdk::with_service(MockService::new(vec![]));
        match sdk.get_badge("agent-1").await {
            Err(IdentityError::BadgeNotFound(id)) => assert_eq!(id, "agent-1"),
            other => panic!("expected BadgeNotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_badge_status_error() {
        let sdk = IdentitySdk::with_service(MockService::new(vec![badge("valid")]));
        let err = sdk.get_badge("unavailable").await.unwrap_err();
        assert!(matches!(err, IdentityError::Status(s) if s.code() == tonic::Code::Unavailable));
    }

    #[tokio::test]
    async fn test_verify_badge() {
        let sdk = IdentitySdk::with_service(MockService::new(vec![]));

        let ok = sdk.verify_badge(badge("valid-jwt")).await.unwrap();
        assert!(ok.status);
        assert!(ok.errors.is_empty());

        let bad = sdk.verify_badge(badge("forged")).await.unwrap();
        assert!(!bad.status);
        assert_eq!(bad.errors[0].reason(), ErrorReason::InvalidProof);

        let sent = sdk.service.verified.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(
            sent[1].vc.as_ref().unwrap().envelope_type(),
            CredentialEnvelopeType::Jose
        );
    }

    #[tokio::test]
    async fn test_with_config_is_lazy() {
        let config = ChannelConfig {
            server_url: "127.0.0.1:9".to_string(),
            tls: crate::TlsMode::Local,
            ..ChannelConfig::default()
        };
        let sdk = IdentitySdk::with_config(&config).unwrap();
        assert!(sdk.get_badge("agent-1").await.is_err());
    }
}
