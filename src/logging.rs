//! Process-wide tracing subscriber (SPEC_FULL.md §1.1): installed once at startup, human-readable
//! compact format, level driven by `RUST_LOG` (defaulting to `info`).

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. Safe to call at most once per process; a second call is a
/// programming error and panics via `tracing`'s own guard.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
