use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::domain::ports::secondary::{
    Email, EmailError, EmailService, SubscriptionError, SubscriptionStorage,
};
use crate::domain::{ConfirmationJob, SubscriberEmail};
use common::err_context::{ErrorContext, ErrorContextExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// The confirmation email was handed to the email service.
    Sent,
    /// The subscription is gone. Nothing was sent.
    Skipped,
}

/// Sends the confirmation email for a subscription.
#[derive(Clone)]
pub struct ConfirmationHandler {
    storage: Arc<dyn SubscriptionStorage + Send + Sync>,
    email: Arc<dyn EmailService + Send + Sync>,
    base_url: String,
}

impl ConfirmationHandler {
    pub fn new(
        storage: Arc<dyn SubscriptionStorage + Send + Sync>,
        email: Arc<dyn EmailService + Send + Sync>,
        base_url: String,
    ) -> Self {
        ConfirmationHandler {
            storage,
            email,
            base_url,
        }
    }

    /// The subscription is read back by id: if it was deleted since the job was
    /// enqueued, the job is skipped rather than failed.
    #[tracing::instrument(name = "Executing confirmation job", skip(self))]
    pub async fn execute(&self, job: &ConfirmationJob) -> Result<JobOutcome, Error> {
        let subscription = self
            .storage
            .get_subscription_by_id(&job.subscription_id)
            .await
            .context(format!(
                "Could not get subscription {}",
                job.subscription_id
            ))?;

        let Some(subscription) = subscription else {
            tracing::warn!(
                subscription_id = %job.subscription_id,
                "Subscription no longer exists, skipping confirmation"
            );
            return Ok(JobOutcome::Skipped);
        };

        let email = confirmation_email(&self.base_url, &subscription.email);
        self.email
            .send_email(email)
            .await
            .context(format!(
                "Could not send confirmation email for subscription {}",
                subscription.id
            ))?;

        Ok(JobOutcome::Sent)
    }
}

fn confirmation_email(base_url: &str, to: &SubscriberEmail) -> Email {
    let html_content = format!(
        r#"Thanks for subscribing to our newsletter!<br/>You will receive the latest news at {to}.<br/>Visit <a href="{base_url}">{base_url}</a> to catch up on past issues."#
    );
    let text_content = format!(
        "Thanks for subscribing to our newsletter!\nYou will receive the latest news at {to}.\nVisit {base_url} to catch up on past issues."
    );

    Email {
        to: to.clone(),
        subject: "Newsletter subscription confirmed".to_string(),
        html_content,
        text_content,
    }
}

#[derive(Debug, Serialize)]
pub enum Error {
    Storage {
        context: String,
        source: SubscriptionError,
    },
    Email {
        context: String,
        source: EmailError,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Storage { context, source } => {
                write!(fmt, "Storage Error: {context} | {source}")
            }
            Error::Email { context, source } => {
                write!(fmt, "Email Error: {context} | {source}")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<ErrorContext<SubscriptionError>> for Error {
    fn from(err: ErrorContext<SubscriptionError>) -> Self {
        Error::Storage {
            context: err.0,
            source: err.1,
        }
    }
}

impl From<ErrorContext<EmailError>> for Error {
    fn from(err: ErrorContext<EmailError>) -> Self {
        Error::Email {
            context: err.0,
            source: err.1,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use fake::faker::internet::en::{IPv4, SafeEmail};
    use fake::Fake;
    use speculoos::prelude::*;
    use uuid::Uuid;

    use super::*;
    use crate::domain::ports::secondary::{MockEmailService, MockSubscriptionStorage};
    use crate::domain::Subscription;

    /// Extracts the single url of a text.
    fn get_url_link(s: &str) -> String {
        let links: Vec<_> = linkify::LinkFinder::new()
            .links(s)
            .filter(|l| *l.kind() == linkify::LinkKind::Url)
            .collect();
        assert_eq!(links.len(), 1);
        links[0].as_str().to_owned()
    }

    fn job() -> ConfirmationJob {
        ConfirmationJob {
            subscription_id: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn execute_should_email_the_stored_address() {
        let job = job();
        let address = SafeEmail().fake::<String>();
        let base_url = format!("http://{}", IPv4().fake::<String>());

        let mut storage = MockSubscriptionStorage::new();
        let stored = address.clone();
        storage
            .expect_get_subscription_by_id()
            .withf(move |id: &Uuid| *id == job.subscription_id)
            .return_once(move |id| {
                Ok(Some(Subscription {
                    id: *id,
                    email: SubscriberEmail::parse(stored).unwrap(),
                    created_at: Utc::now(),
                }))
            });

        let mut email = MockEmailService::new();
        let expected_url = base_url.clone();
        email
            .expect_send_email()
            .withf(move |email: &Email| {
                email.to.as_ref() == address
                    && email.text_content.contains(&address)
                    && get_url_link(&email.text_content).starts_with(&expected_url)
            })
            .times(1)
            .return_once(|_| Ok(()));

        let handler = ConfirmationHandler::new(Arc::new(storage), Arc::new(email), base_url);

        assert_that(&handler.execute(&job).await.unwrap()).is_equal_to(JobOutcome::Sent);
    }

    #[tokio::test]
    async fn execute_should_skip_deleted_subscriptions() {
        let mut storage = MockSubscriptionStorage::new();
        storage
            .expect_get_subscription_by_id()
            .return_once(|_| Ok(None));
        let mut email = MockEmailService::new();
        email.expect_send_email().never();

        let handler = ConfirmationHandler::new(
            Arc::new(storage),
            Arc::new(email),
            "http://127.0.0.1".to_string(),
        );

        assert_that(&handler.execute(&job()).await.unwrap()).is_equal_to(JobOutcome::Skipped);
    }

    #[tokio::test]
    async fn execute_should_report_email_failures() {
        let mut storage = MockSubscriptionStorage::new();
        storage.expect_get_subscription_by_id().return_once(|id| {
            Ok(Some(Subscription {
                id: *id,
                email: SubscriberEmail::parse(SafeEmail().fake::<String>()).unwrap(),
                created_at: Utc::now(),
            }))
        });
        let mut email = MockEmailService::new();
        email.expect_send_email().return_once(|_| {
            Err(EmailError::Configuration {
                context: "no email service".to_string(),
            })
        });

        let handler = ConfirmationHandler::new(
            Arc::new(storage),
            Arc::new(email),
            "http://127.0.0.1".to_string(),
        );

        assert!(matches!(
            handler.execute(&job()).await,
            Err(Error::Email { .. })
        ));
    }
}
