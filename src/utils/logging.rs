use std::sync::Once;

static INIT: Once = Once::new();

/// Install the stderr `tracing` subscriber. `RUST_LOG` wins; unset or invalid falls back to
/// `info`. Reports go to stdout, so logs are kept off it.
pub fn init_tracing() {
    INIT.call_once(|| {
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    });
}
