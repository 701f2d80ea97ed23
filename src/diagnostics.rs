//! Process-level diagnostic channel built on `tracing`.
//!
//! Per-host run logs record what happened to each job; this channel carries
//! everything else (configuration failures, swallowed notification and log
//! errors, run summaries) to stderr.

use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Raised when the global subscriber cannot be installed.
#[derive(Debug, Error)]
#[error("failed to initialise diagnostics: {0}")]
pub struct DiagnosticsError(String);

/// Installs the global subscriber.
///
/// `RUST_LOG` takes precedence over `default_level`; an unparsable level
/// falls back to `info`.
///
/// # Errors
///
/// Returns [`DiagnosticsError`] when a global subscriber is already set.
pub fn init(default_level: &str) -> Result<(), DiagnosticsError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|err| DiagnosticsError(err.to_string()))
}
