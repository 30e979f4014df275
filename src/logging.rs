//! Structured logging setup
//!
//! Installs a `tracing` subscriber whose level filter can be swapped at
//! runtime, so `log-level` and `debug` take effect for the next command.

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

use crate::error::{Error, Result};

/// Environment variable that overrides the configured log level
pub const LOG_ENV: &str = "MORPHEUS_LOG";

/// Handle for changing the active log filter
#[derive(Clone)]
pub struct LogHandle {
    handle: reload::Handle<EnvFilter, Registry>,
}

impl LogHandle {
    /// Replace the active filter with one at `level`
    pub fn set_level(&self, level: LevelFilter) -> Result<()> {
        self.handle
            .reload(filter_for(level))
            .map_err(|e| Error::Other(format!("Failed to change log level: {}", e)))
    }
}

impl std::fmt::Debug for LogHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogHandle").finish_non_exhaustive()
    }
}

/// Install the global subscriber. Returns `None` if one is already set
/// (e.g. a second shell created inside the same test binary).
pub fn init(level: LevelFilter) -> Option<LogHandle> {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| filter_for(level));
    let (layer, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(layer)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init()
        .ok()
        .map(|_| LogHandle { handle })
}

/// Parse a level name such as `info` or `debug`
pub fn parse_level(value: &str) -> Result<LevelFilter> {
    value.trim().parse::<LevelFilter>().map_err(|_| {
        Error::Usage(format!(
            "Invalid log level '{}'. Expected one of: off, error, warn, info, debug, trace",
            value
        ))
    })
}

fn filter_for(level: LevelFilter) -> EnvFilter {
    EnvFilter::default().add_directive(level.into())
}
