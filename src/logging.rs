//! Logging setup for native hosts.
//!
//! The library only emits `tracing` events; hosts that want them printed
//! call [`init_logging`] once at startup.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "firekey_import_core=info";

/// Install a global fmt subscriber filtered by `RUST_LOG`, falling back to
/// `default_filter`.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_logging(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_rejected() {
        init_logging(DEFAULT_FILTER);
        assert!(!init_logging("debug"));
    }
}
