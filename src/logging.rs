//! Logging initialization.
//!
//! Installs a `tracing-subscriber` formatter whose level filter sits behind a
//! reload layer, so diagnostic commands can switch verbosity at runtime.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

use crate::config::LogConfig;
use crate::diagnostics::{DiagnosticError, VerbosityControl};
use crate::error::{RouterError, RouterResult};

/// Reloadable level filter layer.
pub type FilterLayer = reload::Layer<EnvFilter, Registry>;

/// Handle for changing the active log level after initialization.
#[derive(Debug, Clone)]
pub struct LogHandle {
    handle: reload::Handle<EnvFilter, Registry>,
    level: String,
    verbose_level: String,
}

impl LogHandle {
    /// Replaces the active filter with `directives`.
    pub fn set_level(&self, directives: &str) -> Result<(), DiagnosticError> {
        let filter = EnvFilter::try_new(directives)
            .map_err(|e| DiagnosticError::Verbosity(e.to_string()))?;
        self.handle
            .reload(filter)
            .map_err(|e| DiagnosticError::Verbosity(e.to_string()))
    }

    /// Renders the active filter.
    pub fn current_filter(&self) -> Option<String> {
        self.handle.with_current(|filter| filter.to_string()).ok()
    }
}

impl VerbosityControl for LogHandle {
    fn set_verbose(&self, verbose: bool) -> Result<(), DiagnosticError> {
        let level = if verbose { &self.verbose_level } else { &self.level };
        self.set_level(level)?;
        tracing::info!(level = %level, "Log level changed");
        Ok(())
    }
}

/// Builds the reloadable filter layer for `config` and its handle.
///
/// `RUST_LOG` takes precedence over the configured level when set.
pub fn filter_layer(config: &LogConfig) -> (FilterLayer, LogHandle) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let (layer, handle) = reload::Layer::new(filter);
    let handle = LogHandle {
        handle,
        level: config.level.clone(),
        verbose_level: config.verbose_level.clone(),
    };
    (layer, handle)
}

/// Initialize the logging system.
pub fn init_logging(config: &LogConfig) -> RouterResult<LogHandle> {
    let (filter, handle) = filter_layer(config);
    let registry = tracing_subscriber::registry().with(filter);

    let result = if config.json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_file(config.source_location)
                    .with_line_number(config.source_location),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_file(config.source_location)
                    .with_line_number(config.source_location)
                    .with_thread_names(true),
            )
            .try_init()
    };

    result.map_err(|e| RouterError::Custom(format!("Failed to set global tracing subscriber: {e}")))?;
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_switch() {
        let config = LogConfig {
            level: "warn".to_string(),
            verbose_level: "trace".to_string(),
            ..LogConfig::default()
        };
        let (layer, handle) = filter_layer(&config);
        let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(layer));

        handle.set_verbose(true).unwrap();
        assert!(handle.current_filter().unwrap().contains("trace"));

        handle.set_verbose(false).unwrap();
        assert!(handle.current_filter().unwrap().contains("warn"));
    }

    #[test]
    fn test_invalid_directive() {
        let (layer, handle) = filter_layer(&LogConfig::default());
        let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(layer));
        assert!(matches!(
            handle.set_level("topic_router=loudest"),
            Err(DiagnosticError::Verbosity(_))
        ));
    }
}
