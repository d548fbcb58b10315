use std::io;
use std::sync::Once;

use config::Environment;
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_log::LogTracer;
use tracing_log::log::SetLoggerError;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Filter used when `RUST_LOG` is not set.
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to read the environment: {0}")]
    Environment(#[from] io::Error),

    #[error("failed to redirect log records to tracing: {0}")]
    LogTracer(#[from] SetLoggerError),

    #[error("failed to install the tracing subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Flushes buffered log lines when dropped.
///
/// Keep it alive until the end of `main`, otherwise the last lines may be lost.
#[must_use = "dropping the flusher stops the log writer"]
pub struct LogFlusher {
    _guard: WorkerGuard,
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Installs the global subscriber of the binary `app_name`.
///
/// Log lines are written to stdout by a background thread. In [`Environment::Prod`] every line
/// is a JSON object, otherwise lines are formatted for humans. `log` records emitted by
/// dependencies are forwarded to the same subscriber.
pub fn init_tracing(app_name: &str) -> Result<LogFlusher, TracingError> {
    let environment = Environment::load()?;

    LogTracer::init()?;

    let (writer, guard) = tracing_appender::non_blocking(io::stdout());

    if environment.is_prod() {
        let format = tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_writer(writer);

        tracing_subscriber::registry()
            .with(env_filter())
            .with(format)
            .try_init()?;
    } else {
        let format = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(writer);

        tracing_subscriber::registry()
            .with(env_filter())
            .with(format)
            .try_init()?;
    }

    tracing::info!(app_name, %environment, "tracing initialized");

    Ok(LogFlusher { _guard: guard })
}

static INIT_TEST_TRACING: Once = Once::new();

/// Installs a subscriber writing through the test harness, so output only shows for failing
/// tests. Safe to call from every test.
pub fn init_test_tracing() {
    INIT_TEST_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_test_writer()
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracing_can_be_initialized_repeatedly() {
        init_test_tracing();
        init_test_tracing();

        tracing::info!("still logging");
    }
}
