use async_trait::async_trait;
use common::err_context::ErrorContext;
use serde::Serialize;
use serde_with::{serde_as, DisplayFromStr};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::{ConfirmationJob, QueuedJob};

/// A queue of confirmation jobs, with at least once delivery.
///
/// A job handed out by `next` is hidden from other consumers until it is completed,
/// failed, or its visibility timeout expires.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobQueue {
    async fn enqueue(&self, job: ConfirmationJob) -> Result<QueuedJob, Error>;

    /// Claims the oldest job that is due, if any.
    async fn next(&self) -> Result<Option<QueuedJob>, Error>;

    /// Removes a job that was handled.
    async fn complete(&self, id: &Uuid) -> Result<(), Error>;

    /// Records a failure. The job is delivered again after `retry_in`, or never
    /// again if `retry_in` is None.
    async fn fail(&self, id: &Uuid, reason: &str, retry_in: Option<Duration>)
        -> Result<(), Error>;
}

#[serde_as]
#[derive(Debug, Serialize)]
pub enum Error {
    /// Error returned by sqlx
    Database {
        context: String,
        #[serde_as(as = "DisplayFromStr")]
        source: sqlx::Error,
    },
    /// Connection issue with the database
    Connection {
        context: String,
        #[serde_as(as = "DisplayFromStr")]
        source: sqlx::Error,
    },
    /// The job is not (or no longer) in the queue.
    Missing {
        context: String,
    },
    Configuration {
        context: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Database { context, source } => {
                write!(fmt, "Queue Database: {context} | {source}")
            }
            Error::Connection { context, source } => {
                write!(fmt, "Queue Connection: {context} | {source}")
            }
            Error::Missing { context } => {
                write!(fmt, "Missing job: {context}")
            }
            Error::Configuration { context } => {
                write!(fmt, "Queue Configuration: {context}")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<ErrorContext<sqlx::Error>> for Error {
    fn from(err: ErrorContext<sqlx::Error>) -> Self {
        match err.1 {
            sqlx::Error::PoolTimedOut => Error::Connection {
                context: format!("PostgreSQL Queue: Connection Timeout: {}", err.0),
                source: err.1,
            },
            sqlx::Error::Database(_) => Error::Database {
                context: format!("PostgreSQL Queue: Database: {}", err.0),
                source: err.1,
            },
            _ => Error::Connection {
                context: format!("PostgreSQL Queue: {}", err.0),
                source: err.1,
            },
        }
    }
}
