//! Logging setup for binaries
//!
//! The library only emits `tracing` events; installing a subscriber is left to
//! the process that embeds it.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "info,chaos_harness=debug,kube=info";

/// Install a global subscriber with an `EnvFilter` and a human or JSON formatter.
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging(json: bool) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    }
}
