//! identity-sdk - Fetch and verify agent badges from an identity node
//!
//! ```no_run
//! # async fn run() -> identity_sdk::Result<()> {
//! let sdk = identity_sdk::IdentitySdk::new()?;
//! let badge = sdk.get_badge("did:web:agent.example").await?;
//! let result = sdk.verify_badge(badge).await?;
//! println!("verified: {}", result.status);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod log;
pub mod proto;
pub mod sdk;

pub use config::{ChannelConfig, TlsMode};
pub use error::{IdentityError, Result};
pub use proto::{EnvelopedCredential, VerificationResult};
pub use sdk::{IdentitySdk, VcService};
