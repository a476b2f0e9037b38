//! Observability and telemetry.
//!
//! Backends emit `tracing` spans and events and `metrics` counters
//! (`graph_nodes_created_total`, `graph_edges_created_total`,
//! `graph_traversals_total`, `graph_operation_errors_total`,
//! `graph_lock_poison_recovery_total`, all labelled by `backend`). Installing
//! a metrics recorder is left to the embedding application; this module only
//! sets up the log subscriber.

use crate::config::{LogFormat, LoggingConfig};
use crate::{Error, Result};
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static LOGGING_INIT: OnceLock<()> = OnceLock::new();

/// Builds the event filter; `verbose` forces `debug` for this crate.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if the directive does not parse.
pub fn build_filter(config: &LoggingConfig, verbose: bool) -> Result<EnvFilter> {
    let filter = EnvFilter::try_new(&config.filter)
        .map_err(|e| Error::InvalidInput(format!("invalid log filter '{}': {e}", config.filter)))?;
    if verbose {
        let directive = "intelgraph=debug"
            .parse()
            .map_err(|e| Error::InvalidInput(format!("invalid log directive: {e}")))?;
        return Ok(filter.add_directive(directive));
    }
    Ok(filter)
}

/// Installs the global log subscriber, writing to stderr.
///
/// # Errors
///
/// Returns an error if logging has already been initialized or the filter is
/// invalid.
pub fn init_logging(config: &LoggingConfig, verbose: bool) -> Result<()> {
    if LOGGING_INIT.get().is_some() {
        return Err(Error::OperationFailed {
            operation: "logging_init".to_string(),
            cause: "logging already initialized".to_string(),
        });
    }
    let filter = build_filter(config, verbose)?;

    match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_target(true),
            )
            .with(filter)
            .try_init()
            .map_err(init_error)?,
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .with(filter)
            .try_init()
            .map_err(init_error)?,
    }

    LOGGING_INIT.set(()).map_err(|()| Error::OperationFailed {
        operation: "logging_init".to_string(),
        cause: "failed to mark logging initialized".to_string(),
    })
}

/// Helper to convert init errors.
#[allow(clippy::needless_pass_by_value)]
fn init_error(e: tracing_subscriber::util::TryInitError) -> Error {
    Error::OperationFailed {
        operation: "logging_init".to_string(),
        cause: e.to_string(),
    }
}
