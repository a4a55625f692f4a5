use std::env;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable holding the tracing filter directives.
pub const LOG_ENV: &str = "VIDTIDY_LOG";

/// Installs a stderr `fmt` subscriber filtered by `VIDTIDY_LOG` (default
/// `info`). Stdout is left to the plan preview.
pub fn init_logger() {
    let filter = env::var(LOG_ENV).unwrap_or_else(|_| "info".to_string());
    let filter_layer = EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(filter_layer)
        .init();
}
