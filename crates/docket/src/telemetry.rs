//! Global tracing subscriber setup.

use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};
use crate::error::DocketError;

/// Builds the filter. `RUST_LOG` wins over the configured level.
fn env_filter(logging: &LoggingConfig) -> Result<EnvFilter, DocketError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&logging.level).map_err(|e| {
        DocketError::Telemetry(format!("invalid log level '{}': {}", logging.level, e))
    })
}

/// Installs the global subscriber and forwards `log` records into it.
/// Output goes to stderr so exports can stream to stdout.
///
/// Fails if a subscriber or logger is already installed.
pub fn init(logging: &LoggingConfig) -> Result<(), DocketError> {
    let filter = env_filter(logging)?;

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_log::LogTracer::init()
        .map_err(|e| DocketError::Telemetry(format!("failed to bridge log records: {}", e)))?;

    let subscriber = tracing_subscriber::registry().with(filter).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber).map_err(|e| {
        DocketError::Telemetry(format!("failed to install tracing subscriber: {}", e))
    })
}
