//! Logging initialisation via tracing-subscriber.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::error::PanelError;

/// Initialise the global tracing subscriber, writing to stderr so stdout
/// stays clean for panel output.
///
/// `RUST_LOG` takes precedence; `level` is the fallback.
pub fn init(level: &str) -> Result<(), PanelError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| PanelError::Logger(format!("invalid log level '{level}': {e}")))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| PanelError::Logger(format!("failed to set subscriber: {e}")))?;

    Ok(())
}

/// Validate a configured level before installing the subscriber.
pub fn parse_level(level: &str) -> Result<LevelFilter, PanelError> {
    if level.is_empty() {
        return Err(PanelError::Logger("log level must not be empty".into()));
    }
    level
        .parse::<LevelFilter>()
        .map_err(|_| PanelError::Logger(format!("unrecognised log level: '{level}'")))
}
