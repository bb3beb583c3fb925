//! Logging setup
//!
//! Library code only emits `tracing` events; hosts that want them printed call
//! [`init_tracing`] once at startup. `RUST_LOG` controls the filter.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber, defaulting to `info`
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_tracing() -> bool {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true)
        .try_init()
        .is_ok()
}
