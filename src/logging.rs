use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_ENV: &str = "EXAMBOARD_LOG";
const DEFAULT_FILTER: &str = "examboardd=info";

/// Logs go to stderr; stdout carries the response stream.
pub fn init_logging(filter: Option<&str>) {
    let filter = filter
        .map(EnvFilter::new)
        .or_else(|| EnvFilter::try_from_env(LOG_ENV).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER));

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true)
        .try_init();
}
