//! Tracing setup for binaries and tests embedding the advisor.

use tracing_subscriber::EnvFilter;

/// Installs a compact `fmt` subscriber filtered by `RUST_LOG` (default
/// `info`). Returns `false` if a global subscriber was already set.
pub fn init_tracing() -> bool {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .compact()
        .try_init()
        .is_ok()
}
