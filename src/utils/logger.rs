use crate::utils::error::{ParkingError, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How log events are written to stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One short human-readable line per event.
    Compact,
    /// One JSON object per line, event fields flattened to the top level.
    Json,
}

/// Directives used when `RUST_LOG` is unset or unparsable.
pub fn fallback_directives(verbose: bool) -> &'static str {
    if verbose {
        "small_parking=debug,warn"
    } else {
        "small_parking=info,warn"
    }
}

fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback_directives(verbose)))
}

/// Installs the global subscriber. Fails if one is already installed.
pub fn init_logger(format: LogFormat, verbose: bool) -> Result<()> {
    let (compact, json) = match format {
        LogFormat::Compact => (Some(fmt::layer().with_target(false).compact()), None),
        LogFormat::Json => (
            None,
            Some(fmt::layer().json().with_current_span(false).flatten_event(true)),
        ),
    };

    tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(compact)
        .with(json)
        .try_init()
        .map_err(|e| ParkingError::ConfigError {
            message: format!("logger already initialised: {}", e),
        })
}
