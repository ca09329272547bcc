// file: src/logging/logger.rs
// version: 2.0.0
// guid: 4d8e0b35-c1a9-4f72-b6e3-0a5d9c7f2e18

//! Logger initialization and operation spans
//!
//! The interactive shell owns stdout, so log lines go to stderr and stay at
//! `warn` unless asked for.

use crate::error::MultirouterError;
use crate::Result;
use tracing::Instrument;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Pick the filter directive for the given verbosity flags
pub fn filter_directive(verbose: bool, quiet: bool) -> &'static str {
    if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    }
}

/// Initialize the logging system; `RUST_LOG` takes precedence over the flags
pub fn init_logger(verbose: bool, quiet: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(verbose, quiet)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init()
        .map_err(|e| MultirouterError::config(format!("Failed to initialize logger: {}", e)))?;

    Ok(())
}

/// Run `f` inside an `operation` span
pub fn with_operation_span<F, R>(operation: &str, f: F) -> R
where
    F: FnOnce() -> R,
{
    let span = tracing::info_span!("operation", name = operation);
    let _enter = span.enter();
    f()
}

/// Run the future produced by `f` inside an `operation` span
pub async fn with_async_operation_span<F, Fut, R>(operation: &str, f: F) -> R
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = R>,
{
    let span = tracing::info_span!("operation", name = operation);
    async move { f().await }.instrument(span).await
}
