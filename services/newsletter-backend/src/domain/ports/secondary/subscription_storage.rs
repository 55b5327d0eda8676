use async_trait::async_trait;
use common::err_context::ErrorContext;
use serde::Serialize;
use serde_with::{serde_as, DisplayFromStr};
use std::fmt;
use uuid::Uuid;

use crate::domain::{NewSubscription, Subscription};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriptionStorage {
    /// Returns true if a subscription with exactly this email is stored.
    async fn exists_by_email(&self, email: &str) -> Result<bool, Error>;

    /// Stores a new subscription and returns it, with its id and creation date.
    ///
    /// Fails with `Error::Duplicate` if the email is already taken.
    async fn insert(&self, subscription: &NewSubscription) -> Result<Subscription, Error>;

    async fn get_subscription_by_id(&self, id: &Uuid) -> Result<Option<Subscription>, Error>;

    /// Removes a subscription. Returns false if there was none with this id.
    async fn delete_subscription(&self, id: &Uuid) -> Result<bool, Error>;
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
    /// The email is already stored.
    Duplicate {
        context: String,
    },
    /// Data stored cannot be validated
    Validation {
        context: String,
    },
    /// Connection issue with the database
    Connection {
        context: String,
        #[serde_as(as = "DisplayFromStr")]
        source: sqlx::Error,
    },
    Configuration {
        context: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Database { context, source } => {
                write!(fmt, "Database: {context} | {source}")
            }
            Error::Duplicate { context } => {
                write!(fmt, "Duplicate subscription: {context}")
            }
            Error::Validation { context } => {
                write!(fmt, "Data: {context}")
            }
            Error::Connection { context, source } => {
                write!(fmt, "Database Connection: {context} | {source}")
            }
            Error::Configuration { context } => {
                write!(fmt, "Database Configuration: {context}")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<ErrorContext<sqlx::Error>> for Error {
    fn from(err: ErrorContext<sqlx::Error>) -> Self {
        match err.1 {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => Error::Duplicate {
                context: format!("PostgreSQL Storage: {} | {}", err.0, db.message()),
            },
            sqlx::Error::PoolTimedOut => Error::Connection {
                context: format!("PostgreSQL Storage: Connection Timeout: {}", err.0),
                source: err.1,
            },
            sqlx::Error::Database(_) => Error::Database {
                context: format!("PostgreSQL Storage: Database: {}", err.0),
                source: err.1,
            },
            _ => Error::Connection {
                context: format!(
                    "PostgreSQL Storage: Could not establish a connection: {}",
                    err.0
                ),
                source: err.1,
            },
        }
    }
}
