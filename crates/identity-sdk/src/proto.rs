//! Generated types and client for `agntcy.identity.node.v1alpha1.VcService`
//!
//! `VerificationResult` field 2 (the resolved document) is reserved in the
//! schema; prost skips it when decoding.

#![allow(clippy::doc_markdown)]

tonic::include_proto!("agntcy.identity.node.v1alpha1");

pub use vc_service_client::VcServiceClient;

/// Client over a tonic transport channel
pub type VcChannelClient = VcServiceClient<tonic::transport::Channel>;

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn test_envelope_type_accessor() {
        let vc = EnvelopedCredential {
            envelope_type: Some(CredentialEnvelopeType::Jose as i32),
            value: Some("eyJhbGciOi".to_string()),
        };
        assert_eq!(vc.envelope_type(), CredentialEnvelopeType::Jose);
        assert_eq!(
            EnvelopedCredential::default().envelope_type(),
            CredentialEnvelopeType::Unspecified
        );
    }

    #[test]
    fn test_error_reason_values() {
        assert_eq!(ErrorReason::InvalidIssuer as i32, 4);
        assert_eq!(ErrorReason::VerifiableCredentialIsRevoked as i32, 13);
        assert_eq!(ErrorReason::try_from(8).ok(), Some(ErrorReason::InvalidProof));
    }

    #[test]
    fn test_verification_result_skips_document_field() {
        // status=true, then a length-delimited field 2, then controller
        let mut bytes = vec![0x08, 0x01, 0x12, 0x02, b'{', b'}'];
        bytes.extend([0x22, 0x03]);
        bytes.extend(b"did");

        let result = VerificationResult::decode(bytes.as_slice()).unwrap();
        assert!(result.status);
        assert_eq!(result.controller, "did");
        assert!(result.errors.is_empty());
    }
}
