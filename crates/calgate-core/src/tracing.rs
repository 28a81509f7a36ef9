//! Log output for the calgate server.
//!
//! Two switches drive the subscriber: `debug` raises the calgate crates and
//! the HTTP layer to `DEBUG`, `json` writes one JSON object per line. A
//! non-empty `RUST_LOG` replaces the default directives.

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Targets the default directives cover.
pub const LOG_TARGETS: [&str; 2] = ["calgate", "tower_http"];

#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("invalid log filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

/// Subscriber settings derived from the server's log flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TracingConfig {
    pub level: Level,
    pub json: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self::from_flags(false, false)
    }
}

impl TracingConfig {
    #[must_use]
    pub fn from_flags(debug: bool, json: bool) -> Self {
        Self {
            level: if debug { Level::DEBUG } else { Level::INFO },
            json,
        }
    }

    /// `calgate=<level>,tower_http=<level>`
    pub fn default_directives(&self) -> String {
        LOG_TARGETS
            .iter()
            .map(|target| format!("{}={}", target, self.level))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Builds the filter, preferring `rust_log` when it is set and non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`TracingError::EnvFilter`] when a directive does not parse.
    pub fn env_filter(&self, rust_log: Option<&str>) -> Result<EnvFilter, TracingError> {
        let directives = match rust_log.map(str::trim) {
            Some(value) if !value.is_empty() => value.to_string(),
            _ => self.default_directives(),
        };
        Ok(EnvFilter::try_new(directives)?)
    }
}

/// Installs the global subscriber. Call once at startup.
///
/// # Errors
///
/// Fails when `RUST_LOG` is malformed or a subscriber is already installed.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let rust_log = std::env::var("RUST_LOG").ok();
    let filter = config.env_filter(rust_log.as_deref())?;
    let registry = tracing_subscriber::registry().with(filter);

    if config.json {
        // Request spans carry method, path and status; keep them on each line.
        let layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false);
        tracing::subscriber::set_global_default(registry.with(layer))?;
    } else {
        let debug = config.level == Level::DEBUG;
        let layer = fmt::layer()
            .compact()
            .with_file(debug)
            .with_line_number(debug);
        tracing::subscriber::set_global_default(registry.with(layer))?;
    }

    Ok(())
}
