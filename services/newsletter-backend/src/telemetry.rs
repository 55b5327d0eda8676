use std::fmt;
use tracing::subscriber::SetGlobalDefaultError;
use tracing::Subscriber;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::log::SetLoggerError;
use tracing_log::LogTracer;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

use common::err_context::{ErrorContext, ErrorContextExt};

/// Sets up a tracing subscriber, formatting events as bunyan JSON records.
///
/// `env_filter` is used when `RUST_LOG` is not set.
pub fn get_subscriber<Sink>(
    name: String,
    env_filter: String,
    sink: Sink,
) -> impl Subscriber + Send + Sync
where
    Sink: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(env_filter));

    let bunyan_format = BunyanFormattingLayer::new(name, sink);

    Registry::default()
        .with(filter_layer)
        .with(JsonStorageLayer)
        .with(bunyan_format)
}

/// Register a subscriber as global default, and redirect `log` records to it.
pub fn init_subscriber(subscriber: impl Subscriber + Send + Sync) -> Result<(), Error> {
    LogTracer::init().context("Could not redirect log records")?;
    tracing::subscriber::set_global_default(subscriber)
        .context("Could not set global tracing subscriber")?;
    Ok(())
}

#[derive(Debug)]
pub enum Error {
    Logger {
        context: String,
        source: SetLoggerError,
    },
    Subscriber {
        context: String,
        source: SetGlobalDefaultError,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Logger { context, source } => {
                write!(fmt, "Telemetry: {context} | {source}")
            }
            Error::Subscriber { context, source } => {
                write!(fmt, "Telemetry: {context} | {source}")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<ErrorContext<SetLoggerError>> for Error {
    fn from(err: ErrorContext<SetLoggerError>) -> Self {
        Error::Logger {
            context: err.0,
            source: err.1,
        }
    }
}

impl From<ErrorContext<SetGlobalDefaultError>> for Error {
    fn from(err: ErrorContext<SetGlobalDefaultError>) -> Self {
        Error::Subscriber {
            context: err.0,
            source: err.1,
        }
    }
}
