//! One shot messages, carried to the next page in a cookie.
//!
//! The cookie value is the URL safe base64 encoding of the JSON serialized [`Flash`].
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use common::err_context::{ErrorContext, ErrorContextExt};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use std::fmt;
use tower_cookies::cookie::SameSite;
use tower_cookies::{Cookie, Cookies};

use crate::domain::ValidationErrors;

pub const FLASH_COOKIE: &str = "flash";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub flash: Option<String>,
    #[serde(default)]
    pub errors: ValidationErrors,
}

impl Flash {
    pub fn message<S: Into<String>>(message: S) -> Self {
        Flash {
            flash: Some(message.into()),
            errors: ValidationErrors::default(),
        }
    }

    pub fn errors(errors: ValidationErrors) -> Self {
        Flash {
            flash: None,
            errors,
        }
    }

    pub fn encode(&self) -> Result<String, Error> {
        let json = serde_json::to_vec(self).context("Could not serialize flash")?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    pub fn decode(value: &str) -> Result<Flash, Error> {
        let json = URL_SAFE_NO_PAD
            .decode(value)
            .context("Could not decode flash cookie")?;
        let flash = serde_json::from_slice(&json).context("Could not deserialize flash")?;
        Ok(flash)
    }
}

pub fn set_flash(cookies: &Cookies, flash: &Flash) -> Result<(), Error> {
    let mut cookie = Cookie::new(FLASH_COOKIE, flash.encode()?);
    cookie.set_http_only(true);
    cookie.set_path("/");
    cookie.set_same_site(SameSite::Lax);

    cookies.add(cookie);
    Ok(())
}

/// Reads the flash, if any, and removes the cookie.
pub fn take_flash(cookies: &Cookies) -> Result<Option<Flash>, Error> {
    let Some(cookie) = cookies.get(FLASH_COOKIE) else {
        return Ok(None);
    };
    let flash = Flash::decode(cookie.value());

    let mut cookie = Cookie::named(FLASH_COOKIE);
    cookie.set_path("/");
    cookies.remove(cookie);

    flash.map(Some)
}

#[serde_as]
#[derive(Debug, Serialize)]
pub enum Error {
    Serialization {
        context: String,
        #[serde_as(as = "DisplayFromStr")]
        source: serde_json::Error,
    },
    Decoding {
        context: String,
        #[serde_as(as = "DisplayFromStr")]
        source: base64::DecodeError,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Serialization { context, source } => {
                write!(fmt, "Flash Serialization: {context} | {source}")
            }
            Error::Decoding { context, source } => {
                write!(fmt, "Flash Decoding: {context} | {source}")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<ErrorContext<serde_json::Error>> for Error {
    fn from(err: ErrorContext<serde_json::Error>) -> Self {
        Error::Serialization {
            context: err.0,
            source: err.1,
        }
    }
}

impl From<ErrorContext<base64::DecodeError>> for Error {
    fn from(err: ErrorContext<base64::DecodeError>) -> Self {
        Error::Decoding {
            context: err.0,
            source: err.1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use speculoos::prelude::*;

    #[test]
    fn encoded_flash_should_be_cookie_safe() {
        let mut errors = ValidationErrors::default();
        errors.add("email", "The email must be a valid email address.");
        let encoded = Flash::errors(errors).encode().unwrap();
        assert!(encoded
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn decode_should_read_the_json_layout() {
        let value = URL_SAFE_NO_PAD.encode(
            r#"{"flash":"You will receive the latest news at ursula@example.com","errors":{}}"#,
        );
        let flash = Flash::decode(&value).unwrap();
        assert_that(&flash).is_equal_to(Flash::message(
            "You will receive the latest news at ursula@example.com",
        ));
    }

    #[test]
    fn decode_should_reject_garbage() {
        assert!(matches!(
            Flash::decode("not base64!"),
            Err(Error::Decoding { .. })
        ));
        let value = URL_SAFE_NO_PAD.encode("[1, 2]");
        assert!(matches!(
            Flash::decode(&value),
            Err(Error::Serialization { .. })
        ));
    }
}
