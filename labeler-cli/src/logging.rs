use tracing_subscriber::EnvFilter;

/// Initializes `tracing` to write structured log lines to stderr, honoring
/// `RUST_LOG` and defaulting to `info` — matching the original tool's
/// `logging.basicConfig(..., level=logging.INFO)`, which also wrote to
/// stderr.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
