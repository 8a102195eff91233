use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub mod formatter;

pub use formatter::*;

use crate::configs::Config;

/// Builds the filter directive string from the `[logging]` section.
///
/// Falls back to `info` and always silences the `log` bridge below `error`.
pub fn filter_directives(config: &Config) -> String {
    let level = config
        .logging
        .as_ref()
        .and_then(|l| l.level.as_deref())
        .unwrap_or("info");

    match config.logging.as_ref().and_then(|l| l.filters.as_deref()) {
        Some(filters) if !filters.is_empty() => format!("{},log=error,{}", level, filters),
        _ => format!("{},log=error", level),
    }
}

/// Installs the global subscriber. `RUST_LOG` wins over the config file.
///
/// Safe to call more than once; later calls are ignored.
pub fn init(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(config)));

    let stdout_layer = fmt::layer()
        .event_format(SessionFormatter::new(true))
        .with_ansi(true);

    if let Err(e) = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .try_init()
    {
        tracing::debug!("Logger already initialised, keeping it: {}", e);
    }
}
