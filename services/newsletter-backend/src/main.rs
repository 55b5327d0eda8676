use clap::Parser;
use std::fmt;

use common::err_context::{ErrorContext, ErrorContextExt};
use common::settings::{Executor, Settings};
use newsletter::application::opts::{Command, Error as OptsError, Opts};
use newsletter::application::{ApplicationBuilder, Error as ApplicationError};
use newsletter::telemetry::{self, Error as TelemetryError};

#[derive(Debug)]
pub enum Error {
    Telemetry {
        context: String,
        source: TelemetryError,
    },
    Options {
        context: String,
        source: OptsError,
    },
    Application {
        context: String,
        source: ApplicationError,
    },
    Output {
        context: String,
        source: serde_json::Error,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Telemetry { context, source } => {
                write!(fmt, "Telemetry Error: {context} | {source}")
            }
            Error::Application { context, source } => {
                write!(fmt, "Could not build application: {context} | {source}")
            }
            Error::Options { context, source } => {
                write!(fmt, "Options Error: {context} | {source}")
            }
            Error::Output { context, source } => {
                write!(fmt, "Output Error: {context} | {source}")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<ErrorContext<TelemetryError>> for Error {
    fn from(err: ErrorContext<TelemetryError>) -> Self {
        Error::Telemetry {
            context: err.0,
            source: err.1,
        }
    }
}

impl From<ErrorContext<ApplicationError>> for Error {
    fn from(err: ErrorContext<ApplicationError>) -> Self {
        Error::Application {
            context: err.0,
            source: err.1,
        }
    }
}

impl From<ErrorContext<OptsError>> for Error {
    fn from(err: ErrorContext<OptsError>) -> Self {
        Error::Options {
            context: err.0,
            source: err.1,
        }
    }
}

impl From<ErrorContext<serde_json::Error>> for Error {
    fn from(err: ErrorContext<serde_json::Error>) -> Self {
        Error::Output {
            context: err.0,
            source: err.1,
        }
    }
}

#[allow(clippy::result_large_err)]
#[tokio::main]
async fn main() -> Result<(), Error> {
    let subscriber =
        telemetry::get_subscriber("newsletter".to_string(), "info".to_string(), std::io::stdout);
    telemetry::init_subscriber(subscriber).context("Initializing telemetry")?;

    let opts = Opts::parse();

    let cmd = opts.cmd.clone();

    let settings: Settings = opts.try_into().context("Compiling Application Settings")?;

    match cmd {
        Command::Config => {
            let json = serde_json::to_string_pretty(&settings)
                .context("Could not serialize settings")?;
            println!("{json}");
        }
        Command::Run => {
            let app = ApplicationBuilder::new(settings)
                .await
                .context("could not build application")?
                .build()
                .context("could not build application")?;
            app.run_until_stopped()
                .await
                .context("application runtime error")?;
        }
        Command::Worker => {
            if settings.database.executor == Executor::Memory {
                tracing::warn!("The worker has its own in memory queue, it will never receive jobs");
            }
            let worker = ApplicationBuilder::default()
                .storage(settings.database, &settings.worker)
                .await
                .context("could not build worker storage")?
                .email(settings.email_client)
                .context("could not build worker email client")?
                .url(settings.application.base_url)
                .worker(settings.worker)
                .build_worker()
                .context("could not build worker")?;
            tokio::select! {
                _ = worker.run_until_stopped() => {}
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Stopping confirmation worker");
                }
            }
        }
    }
    Ok(())
}
