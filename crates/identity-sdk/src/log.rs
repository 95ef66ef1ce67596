//! Opt-in logging for the SDK
//!
//! Nothing is installed unless `IDENTITY_ENABLE_LOGS=1`, so applications
//! that configure their own subscriber are left alone.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

use crate::constants::{ENV_ENABLE_LOGS, ENV_LOG_LEVEL};

static INIT: Once = Once::new();

/// Map a `LOG_LEVEL` name to a filter directive. Unknown names fall back to debug.
pub fn level_directive(level: &str) -> &'static str {
    match level.trim().to_ascii_uppercase().as_str() {
        "TRACE" => "trace",
        "INFO" => "info",
        "WARN" | "WARNING" => "warn",
        "ERROR" | "CRITICAL" | "FATAL" => "error",
        _ => "debug",
    }
}

/// Install a fmt subscriber at the given level. `INFO` uses a compact
/// `target: message` layout; every other level adds time, level and source
/// location. Returns false if a global subscriber already exists.
pub fn configure(level: &str) -> bool {
    let filter = EnvFilter::new(level_directive(level));

    if level_directive(level) == "info" {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .without_time()
            .with_level(false)
            .with_target(true)
            .try_init()
            .is_ok()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_file(true)
            .with_line_number(true)
            .try_init()
            .is_ok()
    }
}

/// Load `.env` and configure logging when `IDENTITY_ENABLE_LOGS=1`.
/// Runs at most once per process.
pub fn init_from_env() {
    INIT.call_once(|| {
        if std::env::var(ENV_ENABLE_LOGS).as_deref() != Ok("1") {
            return;
        }
        dotenv::dotenv().ok();
        let level = std::env::var(ENV_LOG_LEVEL).unwrap_or_else(|_| "DEBUG".to_string());
        configure(&level);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_directive() {
        assert_eq!(level_directive("INFO"), "info");
        assert_eq!(level_directive("warning"), "warn");
        assert_eq!(level_directive("CRITICAL"), "error");
        assert_eq!(level_directive("DEBUG"), "debug");
        assert_eq!(level_directive("verbose"), "debug");
    }

    #[test]
    fn test_configure_is_idempotent() {
        configure("DEBUG");
        assert!(!configure("INFO"));
    }
}
