//! Tracing/logging initialization.
//!
//! JSON lines on stdout, filterable via `RUST_LOG`. Hosts that need another
//! sink can layer their own subscriber instead of calling this.

use tracing_subscriber::EnvFilter;

/// Initialize JSON logging, filtered via `RUST_LOG` (default `info`).
///
/// Subsequent calls are no-ops.
pub fn init() {
    init_with_default_filter("info");
}

/// Initialize with an explicit fallback filter for when `RUST_LOG` is unset
/// (tests and dev tooling pass `debug` or `warn` here).
pub fn init_with_default_filter(default: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}
