/// Interface to a service for sending email.
use async_trait::async_trait;
use common::err_context::ErrorContext;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use std::fmt;

use crate::domain::SubscriberEmail;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailService {
    async fn send_email(&self, email: Email) -> Result<(), Error>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Email {
    pub to: SubscriberEmail,
    // from will be filled by the EmailService implementation.
    pub subject: String,
    pub html_content: String,
    pub text_content: String,
}

#[serde_as]
#[derive(Debug, Serialize)]
pub enum Error {
    /// The email service could not be reached, or rejected the request.
    Connection {
        context: String,
        #[serde_as(as = "DisplayFromStr")]
        source: reqwest::Error,
    },
    Configuration {
        context: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Connection { context, source } => {
                write!(fmt, "Email Service Connection: {context} | {source}")
            }
            Error::Configuration { context } => {
                write!(fmt, "Email Service Configuration: {context}")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<ErrorContext<reqwest::Error>> for Error {
    fn from(err: ErrorContext<reqwest::Error>) -> Self {
        Error::Connection {
            context: err.0,
            source: err.1,
        }
    }
}
