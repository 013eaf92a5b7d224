//! Logging Setup
//!
//! Embedders that do not bring their own subscriber can call [`init`] once
//! at startup. `RUST_LOG` overrides the default filter; repeated calls are
//! harmless no-ops.

use tracing_subscriber::{fmt, EnvFilter};

/// Install a formatted tracing subscriber with env-filter support.
pub fn init(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
