use serde::Serialize;
use std::fmt;

use crate::domain::ports::secondary::{JobQueue, QueueError, SubscriptionError, SubscriptionStorage};
use crate::domain::{ConfirmationJob, NewSubscription, QueuedJob, Subscription};
use common::err_context::{ErrorContext, ErrorContextExt};

#[derive(Debug, Clone, PartialEq)]
pub enum SubscribeOutcome {
    /// The subscription was stored, and a confirmation job enqueued.
    Subscribed {
        subscription: Subscription,
        job: QueuedJob,
    },
    /// The email was already subscribed. Nothing was written.
    AlreadySubscribed,
}

/// Registers a validated subscription.
///
/// The subscription is stored only if its email is unknown, and only then is a
/// confirmation job enqueued, after the insert. A concurrent request storing the
/// same email first is reported as `AlreadySubscribed`. If the job cannot be
/// enqueued, the subscription is removed again and the queue error returned.
#[tracing::instrument(name = "Subscribing to the newsletter", skip(storage, queue))]
pub async fn subscribe(
    storage: &(dyn SubscriptionStorage + Send + Sync),
    queue: &(dyn JobQueue + Send + Sync),
    subscription: NewSubscription,
) -> Result<SubscribeOutcome, Error> {
    let exists = storage
        .exists_by_email(subscription.email.as_ref())
        .await
        .context("Could not look up subscription by email")?;

    if exists {
        tracing::info!("Prior subscription found");
        return Ok(SubscribeOutcome::AlreadySubscribed);
    }

    let subscription = match storage.insert(&subscription).await {
        Ok(subscription) => subscription,
        Err(SubscriptionError::Duplicate { context }) => {
            tracing::info!("Subscription stored concurrently: {context}");
            return Ok(SubscribeOutcome::AlreadySubscribed);
        }
        Err(err) => {
            return Err(Error::Storage {
                context: "Could not store new subscription".to_string(),
                source: err,
            })
        }
    };

    let job = match queue
        .enqueue(ConfirmationJob {
            subscription_id: subscription.id,
        })
        .await
    {
        Ok(job) => job,
        Err(err) => {
            // A subscription is only kept along with its confirmation job, so that
            // submitting the form again starts over.
            match storage.delete_subscription(&subscription.id).await {
                Ok(_) => tracing::warn!(
                    subscription_id = %subscription.id,
                    "Removed subscription without confirmation job"
                ),
                Err(undo) => tracing::error!(
                    subscription_id = %subscription.id,
                    "Could not remove subscription without confirmation job: {undo}"
                ),
            }
            return Err(Error::Queue {
                context: format!(
                    "Could not enqueue confirmation for subscription {}",
                    subscription.id
                ),
                source: err,
            });
        }
    };

    tracing::info!(subscription_id = %subscription.id, job_id = %job.id, "New subscription");
    Ok(SubscribeOutcome::Subscribed { subscription, job })
}

#[derive(Debug, Serialize)]
pub enum Error {
    Storage {
        context: String,
        source: SubscriptionError,
    },
    Queue {
        context: String,
        source: QueueError,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Storage { context, source } => {
                write!(fmt, "Subscription Storage: {context} | {source}")
            }
            Error::Queue { context, source } => {
                write!(fmt, "Confirmation Queue: {context} | {source}")
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

impl From<ErrorContext<QueueError>> for Error {
    fn from(err: ErrorContext<QueueError>) -> Self {
        Error::Queue {
            context: err.0,
            source: err.1,
        }
    }
}
