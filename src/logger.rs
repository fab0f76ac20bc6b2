use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Filter comes from `HTTPBENCH_LOG`, then `RUST_LOG`, then the verbosity
/// flag. Calling this more than once keeps the first subscriber.
pub fn init_logging(verbose: bool) {
    let filter = std::env::var("HTTPBENCH_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .map_or_else(
            |_| default_filter(verbose),
            |value| EnvFilter::try_new(value).unwrap_or_else(|_| default_filter(verbose)),
        );

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("Logging already initialised");
    }
}

fn default_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    }
}
