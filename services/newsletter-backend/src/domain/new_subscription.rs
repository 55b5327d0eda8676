use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::SubscriberEmail;

pub const EMAIL_REQUIRED: &str = "The email field is required.";
pub const EMAIL_INVALID: &str = "The email must be a valid email address.";

/// A subscription that passed validation, but is not stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSubscription {
    pub email: SubscriberEmail,
}

/// This is the information posted by the subscription form.
///
/// Every field is optional, so that a missing field is reported as a validation
/// error rather than rejected by the extractor.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct SubscriptionRequest {
    pub email: Option<String>,
}

/// Field level validation errors, keyed by form field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrors(pub BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn add(&mut self, field: &str, message: &str) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.to_string());
    }

    pub fn get(&self, field: &str) -> Option<&Vec<String>> {
        self.0.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self
            .0
            .iter()
            .map(|(field, messages)| format!("{field}: {}", messages.join(" ")))
            .collect::<Vec<_>>();
        write!(fmt, "{}", fields.join(", "))
    }
}

impl TryFrom<SubscriptionRequest> for NewSubscription {
    type Error = ValidationErrors;

    fn try_from(request: SubscriptionRequest) -> Result<Self, Self::Error> {
        let mut errors = ValidationErrors::default();
        let email = request
            .email
            .map(|email| email.trim().to_string())
            .filter(|email| !email.is_empty());

        match email {
            None => {
                errors.add("email", EMAIL_REQUIRED);
                Err(errors)
            }
            Some(email) => match SubscriberEmail::parse(email) {
                Ok(email) => Ok(NewSubscription { email }),
                Err(_) => {
                    errors.add("email", EMAIL_INVALID);
                    Err(errors)
                }
            },
        }
    }
}
