//! Channel defaults and environment variable names

use std::time::Duration;

/// Node address used when `IDENTITY_NODE_GRPC_SERVER_URL` is unset
pub const DEFAULT_GRPC_URL: &str = "0.0.0.0:4001";

/// Send and receive limit: 1 GiB
pub const GRPC_MAX_MESSAGE_LENGTH: usize = 1024 * 1024 * 1024;

pub const GRPC_KEEP_ALIVE_TIME: Duration = Duration::from_millis(100_000);

/// Pings allowed without data frames. tonic exposes no knob for this, so it
/// is carried in [`ChannelConfig`](crate::ChannelConfig) for reference only.
pub const GRPC_HTTP2_MAX_PINGS_WITHOUT_DATA: u32 = 1000;

pub const GRPC_KEEP_ALIVE_PERMIT_WITHOUT_CALLS: bool = true;

pub const ENV_GRPC_SERVER_URL: &str = "IDENTITY_NODE_GRPC_SERVER_URL";
pub const ENV_USE_SSL: &str = "IDENTITY_NODE_USE_SSL";
pub const ENV_USE_INSECURE: &str = "IDENTITY_NODE_USE_INSECURE";
pub const ENV_INSECURE_ROOT_CA: &str = "IDENTITY_NODE_INSECURE_ROOT_CA";
pub const ENV_ENABLE_LOGS: &str = "IDENTITY_ENABLE_LOGS";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
