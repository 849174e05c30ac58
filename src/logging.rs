use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber.  A `RUST_LOG` variable replaces the default filter.
pub fn init_logging(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("song_identifier={}", level)));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(debug))
        .with(filter)
        .try_init();
}
