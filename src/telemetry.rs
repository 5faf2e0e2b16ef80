//! Tracing initialization
//!
//! Call once at process start; the filter honors `RUST_LOG` and defaults
//! to `info` for this crate.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("promptloom=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .ok();
}
