//! Logging initialization.

use crate::config::LoggingConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes the global `tracing` subscriber. Returns a guard that is
/// currently a no-op but kept as a handle so callers can hold it for the
/// lifetime of `main` without caring whether a future backend needs drop-time
/// flushing.
pub struct TelemetryGuard;

pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<TelemetryGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let registry = tracing_subscriber::registry().with(filter);

    if config.json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?;
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()?;
    }

    Ok(TelemetryGuard)
}
