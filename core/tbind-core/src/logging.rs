//! Logging helpers for tbind
//!
//! The library only emits `tracing` events. These helpers install a
//! `tracing-subscriber` formatter for binaries and tests; they are no-ops
//! unless the `logging` feature is enabled.

use crate::config::TbConfig;

#[cfg(feature = "logging")]
use tracing_subscriber::{EnvFilter, fmt};

/// Filter used when neither `RUST_LOG` nor a configured level is present.
pub const DEFAULT_FILTER: &str = "tbind_core=info";

/// Initialize logging with the default filter.
///
/// `RUST_LOG` takes precedence when set.
pub fn init() {
    init_with_level(DEFAULT_FILTER)
}

/// Initialize logging with the configured `log_level`, falling back to
/// [`DEFAULT_FILTER`].
pub fn init_from_config(config: &TbConfig) {
    init_with_level(config.log_level.as_deref().unwrap_or(DEFAULT_FILTER))
}

/// Initialize logging with a specific filter directive.
#[cfg(feature = "logging")]
pub fn init_with_level(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // a subscriber may already be installed by the host application
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .try_init();
}

/// Verbose logging routed through the test writer.
#[cfg(feature = "logging")]
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("tbind_core=debug"))
        .with_test_writer()
        .try_init();
}

#[cfg(not(feature = "logging"))]
pub fn init_with_level(_level: &str) {}

#[cfg(not(feature = "logging"))]
pub fn init_test() {}
