use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

/// Installs the global fmt subscriber, writing to stderr so stdout stays free
/// for CSV output. `RUST_LOG` overrides `default_directive`. Calling this
/// twice is harmless.
pub fn init_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();
}
