//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

/// Initialize tracing/logging for the process.
///
/// JSON output by default (set `LOG_FORMAT=plain` for human-readable local
/// logs); level via `RUST_LOG`. Safe to call multiple times — subsequent
/// calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let plain = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("plain"))
        .unwrap_or(false);

    if plain {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_timer(tracing_subscriber::fmt::time::SystemTime)
            .with_target(false)
            .try_init();
    }
}
