//! Logging and tracing utilities

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing with the `RUST_LOG` environment filter, defaulting to
/// `info` when the variable is unset or invalid.
pub fn init_tracing() {
    init_tracing_with("info");
}

/// Initialize tracing with an explicit default directive.
///
/// `RUST_LOG` still takes precedence when set; the directive is only the
/// fallback. Useful for tests and examples that want `debug` output from the
/// orchestration crates without touching the environment.
pub fn init_tracing_with(default_directive: &str) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_directive)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
