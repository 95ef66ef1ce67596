//! Error types for the identity SDK.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IdentityError {
    /// Missing or malformed environment configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Channel could not be set up
    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// The node answered with a gRPC error
    #[error("gRPC status: {0}")]
    Status(#[from] tonic::Status),

    #[error("No badge found for ID: {0}")]
    BadgeNotFound(String),

    #[error("Invalid base64 root CA: {0}")]
    Base64(#[from] base64::DecodeError),
}

pub type Result<T> = std::result::Result<T, IdentityError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_conversion() {
        let err: IdentityError = tonic::Status::not_found("unknown id").into();
        match err {
            IdentityError::Status(status) => assert_eq!(status.code(), tonic::Code::NotFound),
            _ => panic!("Expected Status error variant"),
        }
    }

    #[test]
    fn test_badge_not_found_message() {
        let err = IdentityError::BadgeNotFound("did:agent:1".to_string());
        assert_eq!(err.to_string(), "No badge found for ID: did:agent:1");
    }
}
