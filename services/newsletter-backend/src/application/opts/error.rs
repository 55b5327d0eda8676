use std::fmt;

use common::config::Error as ConfigError;
use common::err_context::ErrorContext;

#[derive(Debug)]
pub enum Error {
    Merging {
        context: String,
        source: ConfigError,
    },
    Deserializing {
        context: String,
        source: ::config::ConfigError,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Merging { context, source } => {
                write!(fmt, "Could not merge settings: {context} | {source}")
            }
            Error::Deserializing { context, source } => {
                write!(fmt, "Could not deserialize settings: {context} | {source}")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<ErrorContext<ConfigError>> for Error {
    fn from(err: ErrorContext<ConfigError>) -> Self {
        Error::Merging {
            context: err.0,
            source: err.1,
        }
    }
}

impl From<ErrorContext<::config::ConfigError>> for Error {
    fn from(err: ErrorContext<::config::ConfigError>) -> Self {
        Error::Deserializing {
            context: err.0,
            source: err.1,
        }
    }
}
