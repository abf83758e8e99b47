//! Structured logging setup via `tracing` + `tracing-subscriber`.
//!
//! The filter is read from `ASSAY_LOG` (same syntax as `RUST_LOG`).

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directive.
pub const LOG_ENV_VAR: &str = "ASSAY_LOG";

/// Install a global fmt subscriber.
///
/// Falls back to `default_filter` when `ASSAY_LOG` is unset or invalid.
/// Returns `false` if a global subscriber was already installed.
pub fn init_tracing(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

/// Span names as constants for programmatic use.
pub mod names {
    pub const LOAD: &str = "assay.load";
    pub const ASSESS: &str = "assay.assess";
    pub const PAIR: &str = "assay.pair";
}
