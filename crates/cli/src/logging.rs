use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Log to stderr, filtered by `RUST_LOG` when set and the configured
/// directive otherwise. Stdout is left for run summaries.
pub fn init(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(filter)
        .init();
}
