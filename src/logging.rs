use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initializes console logging on stderr.
///
/// `RUST_LOG` takes precedence; otherwise the crate logs at `info`.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("banking_advisor=info"));

    let console_layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_writer(std::io::stderr);

    // A second init (e.g. from tests) is harmless, so the error is ignored.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .try_init();
}
