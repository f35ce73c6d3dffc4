use crate::config::LoggingConfig;
use tracing::Span;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `RUST_LOG` takes precedence over the configured level.
pub fn init(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if let Err(e) = result {
        eprintln!("tracing subscriber already installed: {}", e);
    }
}

pub fn trace_fan_out(symbols: usize, batches: usize) -> Span {
    tracing::info_span!(
        "fetch_all",
        symbols = symbols,
        batches = batches,
    )
}

pub fn trace_top_list(limit: usize) -> Span {
    tracing::info_span!(
        "build_top_list",
        limit = limit,
    )
}
