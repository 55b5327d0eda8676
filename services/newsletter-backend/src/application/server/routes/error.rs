use axum::extract::Json;
use axum::http::status::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::application::server::flash::Error as FlashError;
use crate::domain::SubscribeError;
use common::err_context::ErrorContext;

#[derive(Debug, Serialize)]
pub enum Error {
    Subscription {
        context: String,
        source: SubscribeError,
    },
    Flash {
        context: String,
        source: FlashError,
    },
    UnsupportedMediaType {
        context: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Subscription { context, source } => {
                write!(fmt, "Subscription: {context} {source}")
            }
            Error::Flash { context, source } => {
                write!(fmt, "Flash: {context} {source}")
            }
            Error::UnsupportedMediaType { context } => {
                write!(fmt, "Unsupported Media Type: {context}")
            }
        }
    }
}

impl std::error::Error for Error {}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        tracing::error!("{self}");
        self.standardize().into_response()
    }
}

impl From<ErrorContext<SubscribeError>> for Error {
    fn from(err: ErrorContext<SubscribeError>) -> Self {
        Error::Subscription {
            context: err.0,
            source: err.1,
        }
    }
}

impl From<ErrorContext<FlashError>> for Error {
    fn from(err: ErrorContext<FlashError>) -> Self {
        Error::Flash {
            context: err.0,
            source: err.1,
        }
    }
}

impl Error {
    pub fn standardize(&self) -> (StatusCode, Json<Value>) {
        match self {
            Error::Subscription { context, source } => {
                let code = match source {
                    SubscribeError::Storage { .. } => "subscription/storage",
                    SubscribeError::Queue { .. } => "subscription/queue",
                };
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({
                        "status": "fail",
                        "message": context,
                        "code": code
                    })),
                )
            }
            Error::Flash { context, source: _ } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "status": "fail",
                    "message": context,
                    "code": "flash/internal_error"
                })),
            ),
            Error::UnsupportedMediaType { context } => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                Json(serde_json::json!({
                    "status": "fail",
                    "message": context,
                    "code": "subscription/unsupported_media_type"
                })),
            ),
        }
    }
}
