//! Tracing subscriber initialisation.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};

/// Builds the filter: `RUST_LOG` when set, otherwise the configured level.
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Installs the global subscriber. Logs go to stderr so stdout stays free
/// for command output. Calling this twice is harmless.
pub fn init_tracing(config: &LoggingConfig) {
    let registry = tracing_subscriber::registry().with(env_filter(config));

    let installed = match config.format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true),
            )
            .try_init(),
    };

    if installed.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
